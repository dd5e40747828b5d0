//! Knowledge base re-indexing.
//!
//! A knowledge base may have several data sources; syncing always targets
//! the first one reported by the service. The job is started and its id
//! returned immediately. Completion is never awaited.

use thiserror::Error;
use tracing::{error, info};

use crate::error::ServiceError;
use crate::models::IngestionJob;
use crate::traits::KnowledgeBaseAdmin;

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("No data sources found for knowledge base {0}")]
    NoDataSource(String),
    #[error("Failed to get data source: {0}")]
    Lookup(#[source] ServiceError),
    #[error("Failed to sync knowledge base: {0}")]
    Start(#[source] ServiceError),
}

/// Start an ingestion job for the first data source of `knowledge_base_id`.
///
/// A knowledge base with no data sources is rejected before any start call
/// is made.
pub async fn trigger_ingestion(
    admin: &dyn KnowledgeBaseAdmin,
    knowledge_base_id: &str,
) -> Result<IngestionJob, IngestionError> {
    let sources = admin
        .list_data_sources(knowledge_base_id)
        .await
        .map_err(|e| {
            error!(kb = knowledge_base_id, error = %e, "data source lookup failed");
            IngestionError::Lookup(e)
        })?;

    let Some(source) = sources.first() else {
        error!(kb = knowledge_base_id, "no data sources found for knowledge base");
        return Err(IngestionError::NoDataSource(knowledge_base_id.to_string()));
    };

    info!(
        kb = knowledge_base_id,
        data_source = %source.data_source_id,
        "starting ingestion job"
    );
    let job = admin
        .start_ingestion_job(knowledge_base_id, &source.data_source_id)
        .await
        .map_err(|e| {
            error!(kb = knowledge_base_id, error = %e, "failed to start ingestion job");
            IngestionError::Start(e)
        })?;

    info!(job_id = %job.job_id, "knowledge base sync started");
    Ok(job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataSource;
    use crate::traits::ServiceResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeAdmin {
        sources: Vec<DataSource>,
        fail_start: bool,
        started: Mutex<Vec<(String, String)>>,
    }

    impl FakeAdmin {
        fn with_sources(ids: &[&str]) -> Self {
            Self {
                sources: ids
                    .iter()
                    .map(|id| DataSource {
                        data_source_id: id.to_string(),
                        name: None,
                        status: None,
                    })
                    .collect(),
                fail_start: false,
                started: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl KnowledgeBaseAdmin for FakeAdmin {
        async fn list_data_sources(&self, _kb: &str) -> ServiceResult<Vec<DataSource>> {
            Ok(self.sources.clone())
        }

        async fn start_ingestion_job(&self, kb: &str, ds: &str) -> ServiceResult<IngestionJob> {
            self.started
                .lock()
                .unwrap()
                .push((kb.to_string(), ds.to_string()));
            if self.fail_start {
                return Err(ServiceError::Api {
                    service: "bedrock-agent",
                    operation: "StartIngestionJob",
                    status: 409,
                    message: "ConflictException: job already running".into(),
                });
            }
            Ok(IngestionJob {
                job_id: "JOB1".into(),
            })
        }
    }

    #[tokio::test]
    async fn zero_data_sources_never_starts_a_job() {
        let admin = FakeAdmin::with_sources(&[]);
        let err = trigger_ingestion(&admin, "KB1").await.unwrap_err();
        assert!(matches!(err, IngestionError::NoDataSource(ref kb) if kb == "KB1"));
        assert!(admin.started.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn first_data_source_is_used() {
        let admin = FakeAdmin::with_sources(&["DS1", "DS2"]);
        let job = trigger_ingestion(&admin, "KB1").await.unwrap();
        assert_eq!(job.job_id, "JOB1");
        assert_eq!(
            *admin.started.lock().unwrap(),
            vec![("KB1".to_string(), "DS1".to_string())]
        );
    }

    #[tokio::test]
    async fn start_failure_carries_service_message() {
        let mut admin = FakeAdmin::with_sources(&["DS1"]);
        admin.fail_start = true;
        let err = trigger_ingestion(&admin, "KB1").await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to sync knowledge base:"));
        assert!(err.to_string().contains("job already running"));
    }
}
