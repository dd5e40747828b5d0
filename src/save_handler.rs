//! Action-group handler that saves agent-generated files.
//!
//! The agent calls a function with two positional parameters, a file name
//! and the file content. The handler writes the content to the bucket,
//! starts a knowledge base sync, and answers with the action-group response
//! envelope.
//!
//! ```text
//! receive ──▶ validate ──▶ ArtifactRegistry ──▶ ObjectStore::put_object
//!                │                                       │
//!                ▼                                       ▼
//!          400 Rejected                         trigger_ingestion ──▶ respond
//! ```
//!
//! # Dispatch
//!
//! Reserved file names map to an [`ArtifactKind`] in an [`ArtifactRegistry`].
//! Any other name is saved as [`ArtifactKind::Generic`]. Adding a reserved
//! artifact is one [`ArtifactRegistry::register`] call.
//!
//! # Envelope
//!
//! `TEXT.body` is a JSON string whose `save` and `sync` members are
//! themselves JSON-encoded strings:
//!
//! ```json
//! { "response": { "actionGroup": "...", "function": "...",
//!     "functionResponse": { "responseBody": { "TEXT": {
//!       "body": "{\"save\":\"{\\\"status\\\":...}\",\"sync\":\"{...}\"}" } } } },
//!   "messageVersion": "1.0" }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::content_type::{has_extension, resolve_content_type};
use crate::ingestion::trigger_ingestion;
use crate::traits::{KnowledgeBaseAdmin, ObjectStore, PutRequest};
use crate::upload::Clock;

pub const MISSING_CONTENT: &str = "Missing 'content' in request.";
pub const APPLICATION_INVENTORY: &str = "application_inventory.json";
const DEFAULT_MESSAGE_VERSION: &str = "1.0";

/// Incoming action-group function call.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEvent {
    #[serde(default)]
    pub action_group: String,
    #[serde(default)]
    pub function: String,
    #[serde(default)]
    pub message_version: Option<Value>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Parameter {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: Value,
}

impl Parameter {
    /// The value as text; `null` is empty, non-strings are their JSON form.
    pub fn text(&self) -> String {
        match &self.value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl ActionEvent {
    fn param(&self, index: usize) -> String {
        self.parameters.get(index).map(Parameter::text).unwrap_or_default()
    }

    pub fn file_name(&self) -> String {
        self.param(0)
    }

    pub fn content(&self) -> String {
        self.param(1)
    }

    pub fn message_version(&self) -> Value {
        self.message_version
            .clone()
            .filter(|v| !v.is_null())
            .unwrap_or_else(|| Value::String(DEFAULT_MESSAGE_VERSION.to_string()))
    }
}

/// How a file's content is shaped before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Structured inventory document: must be JSON, stored pretty-printed.
    ApplicationInventory,
    /// Anything else: `.json` is pretty-printed, other files are stored verbatim.
    Generic,
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("invalid JSON content: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("{0}")]
    Store(#[from] crate::error::ServiceError),
}

/// Content ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedArtifact {
    pub body: String,
    pub content_type: String,
}

impl ArtifactKind {
    pub fn prepare(self, file_name: &str, content: &str) -> Result<PreparedArtifact, SaveError> {
        match self {
            ArtifactKind::ApplicationInventory => Ok(PreparedArtifact {
                body: pretty_json(content)?,
                content_type: "application/json".to_string(),
            }),
            ArtifactKind::Generic => {
                let body = if has_extension(file_name, "json") {
                    pretty_json(content)?
                } else {
                    content.to_string()
                };
                Ok(PreparedArtifact {
                    body,
                    content_type: resolve_content_type(file_name),
                })
            }
        }
    }
}

fn pretty_json(content: &str) -> Result<String, SaveError> {
    let value: Value = serde_json::from_str(content)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Reserved file names and the artifact kind each one is saved as.
#[derive(Debug, Clone)]
pub struct ArtifactRegistry {
    reserved: HashMap<String, ArtifactKind>,
}

impl Default for ArtifactRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(APPLICATION_INVENTORY, ArtifactKind::ApplicationInventory);
        registry
    }
}

impl ArtifactRegistry {
    pub fn empty() -> Self {
        Self {
            reserved: HashMap::new(),
        }
    }

    pub fn register(&mut self, file_name: impl Into<String>, kind: ArtifactKind) -> &mut Self {
        self.reserved.insert(file_name.into(), kind);
        self
    }

    pub fn kind_for(&self, file_name: &str) -> ArtifactKind {
        self.reserved
            .get(file_name)
            .copied()
            .unwrap_or(ArtifactKind::Generic)
    }
}

/// Result of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutcome {
    /// Input validation failed; nothing was stored or synced.
    Rejected { status_code: u16, body: String },
    /// The action-group response envelope.
    Responded(Value),
}

impl HandlerOutcome {
    pub fn to_json(&self) -> Value {
        match self {
            HandlerOutcome::Rejected { status_code, body } => {
                json!({ "statusCode": status_code, "body": body })
            }
            HandlerOutcome::Responded(envelope) => envelope.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileDetails {
    pub name: String,
    pub size_bytes: usize,
    #[serde(rename = "type")]
    pub content_type: String,
    pub location: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadInfo {
    pub url: Option<String>,
    pub instructions: String,
    pub aws_cli_command: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    pub status: &'static str,
    pub message: String,
    pub file_details: Option<FileDetails>,
    pub download_info: Option<DownloadInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub status: &'static str,
    pub message: String,
    #[serde(rename = "ingestion_Job_Id", skip_serializing_if = "Option::is_none")]
    pub ingestion_job_id: Option<String>,
}

/// Where and how saved files are written.
#[derive(Debug, Clone)]
pub struct SaveSettings {
    pub knowledge_base_id: String,
    pub save_folder: String,
    pub presign_expiry_secs: u64,
}

impl SaveSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            knowledge_base_id: config.agent.knowledge_base_id.clone(),
            save_folder: config.storage.save_folder.clone(),
            presign_expiry_secs: config.storage.presign_expiry_secs,
        }
    }
}

pub struct SaveHandler {
    store: Arc<dyn ObjectStore>,
    admin: Arc<dyn KnowledgeBaseAdmin>,
    clock: Arc<dyn Clock>,
    registry: ArtifactRegistry,
    settings: SaveSettings,
}

impl SaveHandler {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        admin: Arc<dyn KnowledgeBaseAdmin>,
        clock: Arc<dyn Clock>,
        settings: SaveSettings,
    ) -> Self {
        Self {
            store,
            admin,
            clock,
            registry: ArtifactRegistry::default(),
            settings,
        }
    }

    pub fn with_registry(mut self, registry: ArtifactRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub async fn handle(&self, event: &ActionEvent) -> HandlerOutcome {
        info!(
            action_group = %event.action_group,
            function = %event.function,
            parameters = event.parameters.len(),
            "action invoked"
        );

        let file_name = event.file_name();
        let content = event.content();
        info!(file = %file_name, "save requested");

        if content.is_empty() {
            warn!("{}", MISSING_CONTENT);
            return HandlerOutcome::Rejected {
                status_code: 400,
                body: MISSING_CONTENT.to_string(),
            };
        }

        let kind = self.registry.kind_for(&file_name);
        let save = self.save(kind, &file_name, &content).await;
        let sync = self.sync().await;

        HandlerOutcome::Responded(envelope(event, &save, &sync))
    }

    async fn save(&self, kind: ArtifactKind, file_name: &str, content: &str) -> SaveOutcome {
        let timestamp = self.clock.now().format("%Y-%m-%dT%H-%M-%SZ").to_string();
        let key = if file_name.is_empty() {
            format!("{}/{}_file", self.settings.save_folder, timestamp)
        } else {
            format!("{}/{}_{}", self.settings.save_folder, timestamp, file_name)
        };
        let display_name = match file_name {
            "" => key.rsplit('/').next().unwrap_or(&key).to_string(),
            name => name.to_string(),
        };

        match self.write(kind, file_name, content, &key).await {
            Ok(prepared) => {
                let bucket = self.store.bucket();
                let url = match self.store.presign_get(&key, self.settings.presign_expiry_secs) {
                    Ok(url) => Some(url),
                    Err(e) => {
                        error!(%key, error = %e, "failed to generate presigned URL");
                        None
                    }
                };
                let instructions = match url {
                    Some(ref url) => {
                        format!("Copy and paste this URL in your browser to download: {}", url)
                    }
                    None => format!(
                        "File saved to S3 bucket '{}' with key '{}'. Access via AWS Console or CLI.",
                        bucket, key
                    ),
                };
                let local_name = key.rsplit('/').next().unwrap_or(&key);

                SaveOutcome {
                    status: "success",
                    message: format!("✅ File '{}' uploaded successfully!", display_name),
                    file_details: Some(FileDetails {
                        name: display_name.clone(),
                        size_bytes: prepared.body.len(),
                        content_type: prepared.content_type,
                        location: format!("S3: {}/{}", bucket, key),
                    }),
                    download_info: Some(DownloadInfo {
                        url,
                        instructions,
                        aws_cli_command: format!(
                            "aws s3 cp s3://{}/{} ./{}",
                            bucket, key, local_name
                        ),
                    }),
                }
            }
            Err(e) => {
                error!(%key, error = %e, "error saving file");
                SaveOutcome {
                    status: "error",
                    message: format!("Upload failed: {}", e),
                    file_details: None,
                    download_info: None,
                }
            }
        }
    }

    async fn write(
        &self,
        kind: ArtifactKind,
        file_name: &str,
        content: &str,
        key: &str,
    ) -> Result<PreparedArtifact, SaveError> {
        let prepared = kind.prepare(file_name, content)?;
        info!(
            bucket = self.store.bucket(),
            %key,
            content_type = %prepared.content_type,
            ?kind,
            "uploading file"
        );
        self.store
            .put_object(PutRequest {
                key: key.to_string(),
                body: prepared.body.as_bytes().to_vec(),
                content_type: prepared.content_type.clone(),
                metadata: BTreeMap::new(),
            })
            .await?;
        Ok(prepared)
    }

    async fn sync(&self) -> SyncOutcome {
        match trigger_ingestion(self.admin.as_ref(), &self.settings.knowledge_base_id).await {
            Ok(job) => SyncOutcome {
                status: "success",
                message: "File synced successfully.".to_string(),
                ingestion_job_id: Some(job.job_id),
            },
            Err(e) => SyncOutcome {
                status: "error",
                message: e.to_string(),
                ingestion_job_id: None,
            },
        }
    }
}

/// Wrap the two outcomes in the action-group response envelope.
fn envelope(event: &ActionEvent, save: &SaveOutcome, sync: &SyncOutcome) -> Value {
    let body = json!({
        "save": serde_json::to_string(save).unwrap_or_default(),
        "sync": serde_json::to_string(sync).unwrap_or_default(),
    });
    json!({
        "response": {
            "actionGroup": event.action_group,
            "function": event.function,
            "functionResponse": {
                "responseBody": {
                    "TEXT": { "body": body.to_string() }
                }
            }
        },
        "messageVersion": event.message_version(),
    })
}
