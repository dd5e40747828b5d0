//! Core data models shared by the chat, upload, and save paths.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One entry in a session's conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Synthetic notice (e.g. an agent switch) that is never sent to the agent.
    #[serde(default)]
    pub is_context: bool,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// A system notice flagged as context-only.
    pub fn context_note(content: impl Into<String>) -> Self {
        Self {
            is_context: true,
            ..Self::new(Role::System, content)
        }
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            is_context: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Success,
    Error,
}

/// Per-file outcome of an upload batch. Display only, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadResult {
    pub original_name: String,
    pub stored_key: Option<String>,
    pub status: UploadStatus,
    pub message: String,
}

impl UploadResult {
    pub fn is_success(&self) -> bool {
        self.status == UploadStatus::Success
    }
}

/// Handle for a started knowledge-base ingestion job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionJob {
    pub job_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    pub data_source_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub agent_id: String,
    pub agent_name: String,
    #[serde(default)]
    pub agent_status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub latest_agent_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDetail {
    pub agent_id: String,
    pub agent_name: String,
    #[serde(default)]
    pub agent_status: Option<String>,
    #[serde(default)]
    pub foundation_model: Option<String>,
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default, rename = "idleSessionTTLInSeconds")]
    pub idle_session_ttl_in_seconds: Option<u64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Inference parameters as returned by the service.
    #[serde(default)]
    pub prompt_override_configuration: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAlias {
    pub agent_alias_id: String,
    pub agent_alias_name: String,
    #[serde(default)]
    pub agent_alias_status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Order aliases newest first by `updated_at` (falling back to `created_at`).
///
/// Timestamps are compared as RFC 3339 instants. Aliases without a
/// parseable timestamp go last.
pub fn sort_aliases_newest_first(aliases: &mut [AgentAlias]) {
    aliases.sort_by_cached_key(|a| std::cmp::Reverse(alias_timestamp(a)));
}

fn alias_timestamp(alias: &AgentAlias) -> Option<DateTime<FixedOffset>> {
    alias
        .updated_at
        .as_deref()
        .or(alias.created_at.as_deref())
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
}

/// An object listed from the bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredObject {
    pub key: String,
    pub size: i64,
    pub last_modified: DateTime<Utc>,
    /// Parent path of the key, or `"root"` for top-level objects.
    pub folder: String,
}

impl StoredObject {
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// Parent folder of an object key (`"root"` when the key has no `/`).
pub fn folder_of(key: &str) -> String {
    match key.rsplit_once('/') {
        Some((folder, _)) => folder.to_string(),
        None => "root".to_string(),
    }
}

/// A snippet returned by a direct knowledge-base query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub text: String,
    pub score: Option<f64>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallerIdentity {
    pub account: String,
    pub arn: String,
    pub user_id: String,
}

/// A file handed to the upload pipeline.
#[derive(Debug, Clone)]
pub struct FileInput {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl FileInput {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}
