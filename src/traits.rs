//! Collaborator traits for the remote services.
//!
//! Every operation in the crate talks to storage and the agent service
//! through these traits. The [`crate::aws`] module provides the real
//! implementations; tests substitute in-memory fakes.
//!
//! ```text
//!   upload / save_handler ──▶ ObjectStore        (S3)
//!   ingestion             ──▶ KnowledgeBaseAdmin (bedrock-agent)
//!   agents                ──▶ AgentDirectory     (bedrock-agent)
//!   agent / query         ──▶ AgentRuntime       (bedrock-agent-runtime)
//!   check                 ──▶ IdentityProbe      (STS)
//! ```

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::ServiceError;
use crate::models::{
    AgentAlias, AgentDetail, AgentSummary, CallerIdentity, DataSource, IngestionJob,
    RetrievalResult, StoredObject,
};

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// An object to write to the store.
#[derive(Debug, Clone)]
pub struct PutRequest {
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: String,
    /// User metadata (sent as `x-amz-meta-*` headers).
    pub metadata: BTreeMap<String, String>,
}

/// Flat key/value blob store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket name, used in locations and CLI hints.
    fn bucket(&self) -> &str;

    async fn put_object(&self, request: PutRequest) -> ServiceResult<()>;

    async fn get_object(&self, key: &str) -> ServiceResult<Vec<u8>>;

    /// List objects under `prefix` (empty for the whole bucket).
    async fn list_objects(&self, prefix: &str) -> ServiceResult<Vec<StoredObject>>;

    async fn delete_object(&self, key: &str) -> ServiceResult<()>;

    /// A time-limited URL that downloads `key` without credentials.
    fn presign_get(&self, key: &str, expires_secs: u64) -> ServiceResult<String>;
}

/// Agent management: discovery and configuration.
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    async fn list_agents(&self) -> ServiceResult<Vec<AgentSummary>>;

    async fn get_agent(&self, agent_id: &str) -> ServiceResult<AgentDetail>;

    async fn list_agent_aliases(&self, agent_id: &str) -> ServiceResult<Vec<AgentAlias>>;
}

/// Knowledge base administration.
#[async_trait]
pub trait KnowledgeBaseAdmin: Send + Sync {
    async fn list_data_sources(&self, knowledge_base_id: &str) -> ServiceResult<Vec<DataSource>>;

    /// Start an ingestion job and return its id without waiting for it.
    async fn start_ingestion_job(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
    ) -> ServiceResult<IngestionJob>;
}

/// Agent runtime: conversation and retrieval.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Send `input_text` under `session_id` and return the raw response
    /// chunk bytes in arrival order.
    ///
    /// A multibyte character may be split across two chunks, so callers
    /// join the bytes before decoding them as UTF-8.
    async fn invoke_agent(
        &self,
        agent_id: &str,
        alias_id: &str,
        session_id: &str,
        input_text: &str,
    ) -> ServiceResult<Vec<Vec<u8>>>;

    async fn retrieve(
        &self,
        knowledge_base_id: &str,
        query: &str,
        max_results: u32,
    ) -> ServiceResult<Vec<RetrievalResult>>;
}

/// Resolves the identity behind the configured credentials.
#[async_trait]
pub trait IdentityProbe: Send + Sync {
    async fn caller_identity(&self) -> ServiceResult<CallerIdentity>;
}
