//! Configuration loading.
//!
//! Settings come from a TOML file and are then overridden by environment
//! variables, so the same binary runs from a checked-in config on a laptop
//! and from plain env vars inside a serverless runtime.
//!
//! ```toml
//! [aws]
//! region = "us-west-2"
//!
//! [storage]
//! bucket = "acme-knowledge-base"
//! folder = "upload_files"
//!
//! [agent]
//! knowledge_base_id = "KB123"
//! agent_id = "AGENT123"
//! alias_id = "TSTALIASID"
//! ```
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `AWS_REGION` | `aws.region` |
//! | `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN` | `aws.*` credentials |
//! | `S3_BUCKET` | `storage.bucket` |
//! | `S3_BUCKET_FOLDER` | `storage.folder` |
//! | `KNOWLEDGE_BASE_ID` | `agent.knowledge_base_id` |
//! | `AGENT_ID` | `agent.agent_id` |
//! | `AGENT_ALIAS_ID` | `agent.alias_id` |

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AwsConfig {
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
    /// Custom S3 endpoint (MinIO, LocalStack).
    #[serde(default)]
    pub s3_endpoint_url: Option<String>,
    #[serde(default)]
    pub bedrock_agent_endpoint_url: Option<String>,
    #[serde(default)]
    pub bedrock_runtime_endpoint_url: Option<String>,
    #[serde(default)]
    pub sts_endpoint_url: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            s3_endpoint_url: None,
            bedrock_agent_endpoint_url: None,
            bedrock_runtime_endpoint_url: None,
            sts_endpoint_url: None,
        }
    }
}

fn default_region() -> String {
    "us-west-2".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default)]
    pub bucket: String,
    /// Folder that interactive uploads land in.
    #[serde(default = "default_folder")]
    pub folder: String,
    /// Folder that agent-generated artifacts are saved to.
    #[serde(default = "default_save_folder")]
    pub save_folder: String,
    #[serde(default = "default_presign_expiry_secs")]
    pub presign_expiry_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            folder: default_folder(),
            save_folder: default_save_folder(),
            presign_expiry_secs: default_presign_expiry_secs(),
        }
    }
}

fn default_folder() -> String {
    "upload_files".to_string()
}
fn default_save_folder() -> String {
    "save_data".to_string()
}
fn default_presign_expiry_secs() -> u64 {
    18_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    #[serde(default)]
    pub knowledge_base_id: String,
    #[serde(default)]
    pub agent_id: String,
    #[serde(default = "default_alias_id")]
    pub alias_id: String,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            knowledge_base_id: String::new(),
            agent_id: String::new(),
            alias_id: default_alias_id(),
            max_results: default_max_results(),
        }
    }
}

fn default_alias_id() -> String {
    "TSTALIASID".to_string()
}
fn default_max_results() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    60
}
fn default_read_timeout_secs() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:9000".to_string()
}

impl Config {
    /// Names of required resources that are not configured.
    ///
    /// These are reported as warnings; the process still starts so that
    /// credential checks and agent listing keep working.
    pub fn missing_resources(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.storage.bucket.is_empty() {
            missing.push("storage.bucket (S3_BUCKET)");
        }
        if self.agent.knowledge_base_id.is_empty() {
            missing.push("agent.knowledge_base_id (KNOWLEDGE_BASE_ID)");
        }
        if self.agent.agent_id.is_empty() {
            missing.push("agent.agent_id (AGENT_ID)");
        }
        missing
    }

    /// `"manual"` when an explicit key pair is configured, `"default"` otherwise.
    pub fn credential_method(&self) -> &'static str {
        if self.aws.access_key_id.is_some() && self.aws.secret_access_key.is_some() {
            "manual"
        } else {
            "default"
        }
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("AWS_REGION") {
            self.aws.region = v;
        }
        if let Some(v) = non_empty("AWS_ACCESS_KEY_ID") {
            self.aws.access_key_id = Some(v);
        }
        if let Some(v) = non_empty("AWS_SECRET_ACCESS_KEY") {
            self.aws.secret_access_key = Some(v);
        }
        if let Some(v) = non_empty("AWS_SESSION_TOKEN") {
            self.aws.session_token = Some(v);
        }
        if let Some(v) = non_empty("S3_BUCKET") {
            self.storage.bucket = v;
        }
        if let Some(v) = non_empty("S3_BUCKET_FOLDER") {
            self.storage.folder = v;
        }
        if let Some(v) = non_empty("KNOWLEDGE_BASE_ID") {
            self.agent.knowledge_base_id = v;
        }
        if let Some(v) = non_empty("AGENT_ID") {
            self.agent.agent_id = v;
        }
        if let Some(v) = non_empty("AGENT_ALIAS_ID") {
            self.agent.alias_id = v;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.aws.region.trim().is_empty() {
            anyhow::bail!("aws.region must not be empty");
        }
        if self.http.connect_timeout_secs == 0 || self.http.read_timeout_secs == 0 {
            anyhow::bail!("http timeouts must be > 0");
        }
        if self.agent.max_results == 0 {
            anyhow::bail!("agent.max_results must be >= 1");
        }
        if self.storage.presign_expiry_secs == 0 || self.storage.presign_expiry_secs > 604_800 {
            anyhow::bail!("storage.presign_expiry_secs must be in 1..=604800");
        }
        Ok(())
    }
}

/// Load the config file at `path` (if it exists) and apply environment overrides.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        parse_config(&content)?
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Config::default()
    };
    finish(config, |key| std::env::var(key).ok())
}

pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).with_context(|| "Failed to parse config file")
}

fn finish<F>(mut config: Config, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    config.apply_env(lookup);
    config.validate()?;
    Ok(config)
}
