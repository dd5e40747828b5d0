//! CLI command implementations.
//!
//! Each `run_*` function backs one `kbchat` subcommand: it builds the AWS
//! clients from config, calls into the library, and prints the result to
//! stdout.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::agent::{self, ConnectionStatus};
use crate::aws::AwsClients;
use crate::config::Config;
use crate::format::{format_datetime, format_file_size, text_preview};
use crate::ingestion::trigger_ingestion;
use crate::models::UploadStatus;
use crate::progress::ProgressMode;
use crate::save_handler::{ActionEvent, SaveHandler, SaveSettings};
use crate::scan::collect_local_files;
use crate::upload::{self, SystemClock};

fn connect(config: &Config) -> Result<AwsClients> {
    AwsClients::connect(config).context("Failed to initialize AWS clients")
}

/// Print a warning for each required resource that is not configured.
pub fn warn_missing_resources(config: &Config) {
    let missing = config.missing_resources();
    if missing.is_empty() {
        return;
    }
    tracing::warn!(?missing, "configuration incomplete");
    eprintln!("Warning: missing configuration:");
    for item in missing {
        eprintln!("  - {}", item);
    }
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.is_empty() {
        bail!("{} is not configured", what);
    }
    Ok(())
}

pub async fn run_check(config: &Config) -> Result<()> {
    let clients = connect(config)?;
    match agent::check_credentials(config, &clients.sts, &clients.bedrock).await {
        ConnectionStatus::Connected {
            account,
            arn,
            user_id,
            agent_count,
            region,
            credential_method,
        } => {
            println!("Connected to AWS");
            println!("  Account:     {}", account);
            println!("  ARN:         {}", arn);
            println!("  User ID:     {}", user_id);
            println!("  Region:      {}", region);
            println!("  Credentials: {}", credential_method);
            println!("  Agents:      {}", agent_count);
        }
        ConnectionStatus::Failed {
            error,
            region,
            credential_method,
        } => {
            println!("Connection failed: {}", error);
            println!("  Region:      {}", region);
            println!("  Credentials: {}", credential_method);
            bail!("credential check failed");
        }
    }
    Ok(())
}

pub async fn run_agents_list(config: &Config) -> Result<()> {
    let clients = connect(config)?;
    let agents = agent::list_agents(&clients.bedrock).await;
    if agents.is_empty() {
        println!("No agents found.");
        return Ok(());
    }
    println!("{:<12} {:<32} {:<12} UPDATED", "ID", "NAME", "STATUS");
    for a in &agents {
        println!(
            "{:<12} {:<32} {:<12} {}",
            a.agent_id,
            text_preview(&a.agent_name, 29),
            a.agent_status.as_deref().unwrap_or("-"),
            a.updated_at.as_deref().unwrap_or("-")
        );
    }
    println!("\n{} agent(s)", agents.len());
    Ok(())
}

pub async fn run_agents_show(config: &Config, agent_id: &str) -> Result<()> {
    let clients = connect(config)?;
    let Some(detail) = agent::get_agent(&clients.bedrock, agent_id).await else {
        bail!("Agent not found or not accessible: {}", agent_id);
    };

    println!("Agent: {} ({})", detail.agent_name, detail.agent_id);
    println!("  Status:       {}", detail.agent_status.as_deref().unwrap_or("Unknown"));
    println!("  Model:        {}", detail.foundation_model.as_deref().unwrap_or("Unknown"));
    if let Some(ttl) = detail.idle_session_ttl_in_seconds {
        println!("  Session TTL:  {}s", ttl);
    }
    if let Some(ref created) = detail.created_at {
        println!("  Created:      {}", created);
    }
    if let Some(ref updated) = detail.updated_at {
        println!("  Updated:      {}", updated);
    }
    if let Some(ref instruction) = detail.instruction {
        println!("\nInstruction:\n{}", instruction);
    }
    if let Some(ref params) = detail.prompt_override_configuration {
        println!(
            "\nInference parameters:\n{}",
            serde_json::to_string_pretty(params)?
        );
    }
    Ok(())
}

pub async fn run_agents_aliases(config: &Config, agent_id: &str) -> Result<()> {
    let clients = connect(config)?;
    let aliases = agent::list_agent_aliases(&clients.bedrock, agent_id).await;
    if aliases.is_empty() {
        println!("No aliases found for agent {}.", agent_id);
        return Ok(());
    }
    for alias in aliases {
        println!(
            "{:<12} {:<24} {:<10} {}",
            alias.agent_alias_id,
            alias.agent_alias_name,
            alias.agent_alias_status.as_deref().unwrap_or("-"),
            alias
                .updated_at
                .as_deref()
                .or(alias.created_at.as_deref())
                .unwrap_or("-")
        );
    }
    Ok(())
}

/// Upload files and directories, then start a sync unless `no_sync`.
///
/// Progress is reported per `progress`, or human-readable on a terminal
/// when unset.
pub async fn run_upload(
    config: &Config,
    paths: &[PathBuf],
    excludes: &[String],
    no_sync: bool,
    progress: Option<ProgressMode>,
) -> Result<()> {
    require(&config.storage.bucket, "storage.bucket")?;
    let local = collect_local_files(paths, excludes)?;
    if local.inputs.is_empty() && local.unreadable.is_empty() {
        println!("No files to upload.");
        return Ok(());
    }

    let clients = connect(config)?;
    let reporter = progress
        .unwrap_or_else(ProgressMode::default_for_tty)
        .reporter();
    let mut report = upload::upload_files(
        &clients.s3,
        &config.storage.folder,
        &local.inputs,
        &SystemClock,
        reporter.as_ref(),
    )
    .await;
    for result in local.unreadable {
        report.push(result);
    }

    for result in report.results() {
        let mark = match result.status {
            UploadStatus::Success => "ok ",
            UploadStatus::Error => "ERR",
        };
        println!("{} {}  {}", mark, result.original_name, result.message);
    }
    if report.succeeded() > 0 {
        println!("Successfully uploaded {} file(s)", report.succeeded());
    }
    if report.failed() > 0 {
        println!("Failed to upload {} file(s)", report.failed());
    }

    if report.succeeded() > 0 && !no_sync {
        run_sync_with(config, &clients).await?;
    }
    if report.failed() > 0 {
        bail!("{} upload(s) failed", report.failed());
    }
    Ok(())
}

pub async fn run_files_list(config: &Config, prefix: Option<&str>) -> Result<()> {
    require(&config.storage.bucket, "storage.bucket")?;
    let clients = connect(config)?;
    let prefix = prefix.unwrap_or("");
    let files = upload::list_files(&clients.s3, prefix).await;
    if files.is_empty() {
        println!("No files found.");
        return Ok(());
    }

    for (folder, objects) in upload::group_by_folder(&files) {
        println!("{}/ ({} files)", folder, objects.len());
        for obj in objects {
            println!(
                "  {:<48} {:>9}  {}",
                obj.file_name(),
                format_file_size(obj.size.max(0) as u64),
                format_datetime(&obj.last_modified)
            );
        }
    }
    Ok(())
}

pub async fn run_files_delete(config: &Config, key: &str, no_sync: bool) -> Result<()> {
    require(&config.storage.bucket, "storage.bucket")?;
    let clients = connect(config)?;
    if !upload::delete_file(&clients.s3, key).await {
        bail!("Failed to delete {}", key);
    }
    println!("Deleted {}", key);
    if !no_sync {
        run_sync_with(config, &clients).await?;
    }
    Ok(())
}

pub async fn run_sync(config: &Config) -> Result<()> {
    let clients = connect(config)?;
    run_sync_with(config, &clients).await
}

async fn run_sync_with(config: &Config, clients: &AwsClients) -> Result<()> {
    require(&config.agent.knowledge_base_id, "agent.knowledge_base_id")?;
    let job = trigger_ingestion(&clients.bedrock, &config.agent.knowledge_base_id).await?;
    println!("Knowledge base sync started. Job ID: {}", job.job_id);
    Ok(())
}

pub async fn run_query(config: &Config, query: &str, max_results: Option<u32>) -> Result<()> {
    require(&config.agent.knowledge_base_id, "agent.knowledge_base_id")?;
    let clients = connect(config)?;
    let results = agent::query_knowledge_base(
        &clients.runtime,
        &config.agent.knowledge_base_id,
        query,
        max_results.unwrap_or(config.agent.max_results),
    )
    .await;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }
    for (i, r) in results.iter().enumerate() {
        let score = r.score.map(|s| format!("{:.3}", s)).unwrap_or_else(|| "-".into());
        println!("{}. [{}] {}", i + 1, score, r.location.as_deref().unwrap_or("(unknown)"));
        println!("   {}", text_preview(&r.text.replace('\n', " "), 200));
    }
    Ok(())
}

/// Run the save handler on an event read from `path` and print the response.
pub async fn run_handle_event(config: &Config, path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event file: {}", path.display()))?;
    let event: ActionEvent = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid action event: {}", path.display()))?;

    let clients = connect(config)?;
    let handler = SaveHandler::new(
        Arc::new(clients.s3),
        Arc::new(clients.bedrock),
        Arc::new(SystemClock),
        SaveSettings::from_config(config),
    );
    let outcome = handler.handle(&event).await;
    println!("{}", serde_json::to_string_pretty(&outcome.to_json())?);
    Ok(())
}

pub async fn run_debug(config: &Config) -> Result<()> {
    let clients = connect(config)?;
    let info = agent::debug_connection(config, &clients.s3, &clients.bedrock).await;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
