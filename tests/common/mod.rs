//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use kbchat::error::ServiceError;
use kbchat::models::{
    folder_of, AgentAlias, AgentDetail, AgentSummary, CallerIdentity, DataSource, IngestionJob,
    RetrievalResult, StoredObject,
};
use kbchat::traits::{
    AgentDirectory, AgentRuntime, IdentityProbe, KnowledgeBaseAdmin, ObjectStore, PutRequest,
    ServiceResult,
};
use kbchat::upload::Clock;
use std::collections::BTreeMap;
use std::sync::Mutex;

pub fn api_error(service: &'static str, operation: &'static str, message: &str) -> ServiceError {
    ServiceError::Api {
        service,
        operation,
        status: 400,
        message: message.to_string(),
    }
}

// ─── Clock ──────────────────────────────────────────────────────────

pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Self {
        Self(Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

// ─── Object store ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    pub objects: Mutex<BTreeMap<String, PutRequest>>,
    pub puts: Mutex<Vec<String>>,
    /// Keys whose names contain one of these substrings fail to upload.
    pub fail_keys_containing: Vec<String>,
    pub fail_presign: bool,
}

impl MemoryStore {
    pub fn put_count(&self) -> usize {
        self.puts.lock().unwrap().len()
    }

    pub fn object(&self, key: &str) -> Option<PutRequest> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn bucket(&self) -> &str {
        "kb-bucket"
    }

    async fn put_object(&self, request: PutRequest) -> ServiceResult<()> {
        self.puts.lock().unwrap().push(request.key.clone());
        if self
            .fail_keys_containing
            .iter()
            .any(|s| request.key.contains(s.as_str()))
        {
            return Err(api_error("s3", "PutObject", "AccessDenied: write refused"));
        }
        self.objects
            .lock()
            .unwrap()
            .insert(request.key.clone(), request);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> ServiceResult<Vec<u8>> {
        self.object(key)
            .map(|o| o.body)
            .ok_or_else(|| api_error("s3", "GetObject", "NoSuchKey"))
    }

    async fn list_objects(&self, prefix: &str) -> ServiceResult<Vec<StoredObject>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .values()
            .filter(|o| o.key.starts_with(prefix))
            .map(|o| StoredObject {
                key: o.key.clone(),
                size: o.body.len() as i64,
                last_modified: Utc::now(),
                folder: folder_of(&o.key),
            })
            .collect())
    }

    async fn delete_object(&self, key: &str) -> ServiceResult<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    fn presign_get(&self, key: &str, expires_secs: u64) -> ServiceResult<String> {
        if self.fail_presign {
            return Err(ServiceError::Credentials("no signing key".into()));
        }
        Ok(format!(
            "https://kb-bucket.example/{}?X-Amz-Expires={}",
            key, expires_secs
        ))
    }
}

// ─── Knowledge base admin ───────────────────────────────────────────

pub struct FakeKnowledgeBase {
    pub data_sources: Vec<String>,
    pub started: Mutex<Vec<(String, String)>>,
}

impl FakeKnowledgeBase {
    pub fn with_sources(ids: &[&str]) -> Self {
        Self {
            data_sources: ids.iter().map(|s| s.to_string()).collect(),
            started: Mutex::new(Vec::new()),
        }
    }

    pub fn start_count(&self) -> usize {
        self.started.lock().unwrap().len()
    }
}

#[async_trait]
impl KnowledgeBaseAdmin for FakeKnowledgeBase {
    async fn list_data_sources(&self, _kb: &str) -> ServiceResult<Vec<DataSource>> {
        Ok(self
            .data_sources
            .iter()
            .map(|id| DataSource {
                data_source_id: id.clone(),
                name: Some(format!("{}-name", id)),
                status: Some("AVAILABLE".into()),
            })
            .collect())
    }

    async fn start_ingestion_job(&self, kb: &str, ds: &str) -> ServiceResult<IngestionJob> {
        let mut started = self.started.lock().unwrap();
        started.push((kb.to_string(), ds.to_string()));
        Ok(IngestionJob {
            job_id: format!("JOB{}", started.len()),
        })
    }
}

// ─── Agent service ──────────────────────────────────────────────────

/// Echoes the payload it receives, split into two chunks.
#[derive(Default)]
pub struct EchoAgent {
    pub payloads: Mutex<Vec<(String, String)>>,
    pub fail_identity: Option<String>,
}

#[async_trait]
impl AgentRuntime for EchoAgent {
    async fn invoke_agent(
        &self,
        _agent_id: &str,
        _alias_id: &str,
        session_id: &str,
        input_text: &str,
    ) -> ServiceResult<Vec<Vec<u8>>> {
        self.payloads
            .lock()
            .unwrap()
            .push((session_id.to_string(), input_text.to_string()));
        let last_line = input_text.rsplit("\n\n").next().unwrap_or(input_text);
        Ok(vec![b"echo: ".to_vec(), last_line.as_bytes().to_vec()])
    }

    async fn retrieve(
        &self,
        _kb: &str,
        query: &str,
        max_results: u32,
    ) -> ServiceResult<Vec<RetrievalResult>> {
        Ok((0..max_results.min(2))
            .map(|i| RetrievalResult {
                text: format!("{} #{}", query, i),
                score: Some(1.0 - i as f64 / 10.0),
                location: Some(format!("s3://kb-bucket/upload_files/{}.md", i)),
            })
            .collect())
    }
}

#[async_trait]
impl AgentDirectory for EchoAgent {
    async fn list_agents(&self) -> ServiceResult<Vec<AgentSummary>> {
        Ok(vec![AgentSummary {
            agent_id: "AG1".into(),
            agent_name: "analyst".into(),
            agent_status: Some("PREPARED".into()),
            description: None,
            updated_at: None,
            latest_agent_version: Some("1".into()),
        }])
    }

    async fn get_agent(&self, agent_id: &str) -> ServiceResult<AgentDetail> {
        Err(api_error(
            "bedrock-agent",
            "GetAgent",
            &format!("ResourceNotFoundException: {}", agent_id),
        ))
    }

    async fn list_agent_aliases(&self, _agent_id: &str) -> ServiceResult<Vec<AgentAlias>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl IdentityProbe for EchoAgent {
    async fn caller_identity(&self) -> ServiceResult<CallerIdentity> {
        if let Some(ref message) = self.fail_identity {
            return Err(api_error("sts", "GetCallerIdentity", message));
        }
        Ok(CallerIdentity {
            account: "123456789012".into(),
            arn: "arn:aws:iam::123456789012:user/ops".into(),
            user_id: "AIDAOPS".into(),
        })
    }
}
