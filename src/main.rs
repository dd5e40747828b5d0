//! # kbchat CLI
//!
//! Upload documents to an S3 bucket, re-index the Bedrock knowledge base
//! built on it, and chat with the agent that retrieves from it.
//!
//! ## Usage
//!
//! ```bash
//! kbchat --config ./config/kbchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kbchat check` | Verify credentials and count visible agents |
//! | `kbchat agents list` | List agents |
//! | `kbchat agents show <id>` | Show an agent's configuration |
//! | `kbchat agents aliases <id>` | List an agent's aliases, newest first |
//! | `kbchat chat` | Interactive chat with an agent |
//! | `kbchat upload <paths>...` | Upload files or directories, then sync |
//! | `kbchat files list` | List stored files grouped by folder |
//! | `kbchat files delete <key>` | Delete a stored file, then sync |
//! | `kbchat sync` | Start a knowledge base ingestion job |
//! | `kbchat query "<text>"` | Query the knowledge base directly |
//! | `kbchat handle-event <file>` | Run the save handler on an event file |
//! | `kbchat serve` | Serve the save handler over HTTP |
//! | `kbchat debug` | Print connection diagnostics |
//!
//! ## Examples
//!
//! ```bash
//! # Check credentials
//! kbchat check
//!
//! # Upload a docs folder, skipping drafts
//! kbchat upload ./docs --exclude "**/drafts/**"
//!
//! # Chat through the newest alias of an agent
//! kbchat chat --agent AGENT123 --latest-alias
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use kbchat::progress::ProgressMode;
use kbchat::{chat, commands, config, server};

/// kbchat: documents in, answers out.
///
/// Settings come from a TOML file (`--config`) and environment variables
/// such as `AWS_REGION`, `S3_BUCKET`, `KNOWLEDGE_BASE_ID`, and `AGENT_ID`.
#[derive(Parser)]
#[command(
    name = "kbchat",
    about = "Upload documents, sync a Bedrock knowledge base, and chat with its agent",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Missing files fall back to
    /// defaults plus environment variables.
    #[arg(long, global = true, default_value = "./config/kbchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify credentials via STS and count the visible agents.
    Check,

    /// Inspect Bedrock agents.
    Agents {
        #[command(subcommand)]
        action: AgentsAction,
    },

    /// Chat with an agent.
    Chat {
        /// Agent id (defaults to `agent.agent_id`).
        #[arg(long)]
        agent: Option<String>,

        /// Alias id (defaults to `agent.alias_id`).
        #[arg(long)]
        alias: Option<String>,

        /// Use the agent's most recently updated alias.
        #[arg(long)]
        latest_alias: bool,
    },

    /// Upload files or directories into the configured folder.
    Upload {
        /// Files or directories. Directories are walked recursively.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Glob patterns to skip, relative to each directory argument.
        #[arg(long = "exclude")]
        excludes: Vec<String>,

        /// Do not start a knowledge base sync afterwards.
        #[arg(long)]
        no_sync: bool,

        /// Progress output on stderr: human, json, or off. Defaults to
        /// human on a terminal and off otherwise.
        #[arg(long)]
        progress: Option<ProgressMode>,
    },

    /// Manage stored files.
    Files {
        #[command(subcommand)]
        action: FilesAction,
    },

    /// Start a knowledge base ingestion job.
    Sync,

    /// Query the knowledge base without going through the agent.
    Query {
        query: String,

        /// Maximum number of results (defaults to `agent.max_results`).
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Run the save handler on an action event read from a JSON file.
    HandleEvent { path: PathBuf },

    /// Serve the save handler over HTTP on `[server].bind`.
    Serve,

    /// Print connection diagnostics.
    Debug,
}

#[derive(Subcommand)]
enum AgentsAction {
    /// List all agents.
    List,
    /// Show an agent's status, model, instruction, and inference parameters.
    Show { id: String },
    /// List an agent's aliases, newest first.
    Aliases { id: String },
}

#[derive(Subcommand)]
enum FilesAction {
    /// List stored files grouped by folder.
    List {
        /// Only list keys under this prefix.
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Delete a stored file by key.
    Delete {
        key: String,

        /// Do not start a knowledge base sync afterwards.
        #[arg(long)]
        no_sync: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kbchat=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    commands::warn_missing_resources(&cfg);

    match cli.command {
        Commands::Check => commands::run_check(&cfg).await?,
        Commands::Agents { action } => match action {
            AgentsAction::List => commands::run_agents_list(&cfg).await?,
            AgentsAction::Show { id } => commands::run_agents_show(&cfg, &id).await?,
            AgentsAction::Aliases { id } => commands::run_agents_aliases(&cfg, &id).await?,
        },
        Commands::Chat {
            agent,
            alias,
            latest_alias,
        } => {
            chat::run_chat(&cfg, agent.as_deref(), alias.as_deref(), latest_alias).await?;
        }
        Commands::Upload {
            paths,
            excludes,
            no_sync,
            progress,
        } => commands::run_upload(&cfg, &paths, &excludes, no_sync, progress).await?,
        Commands::Files { action } => match action {
            FilesAction::List { prefix } => {
                commands::run_files_list(&cfg, prefix.as_deref()).await?
            }
            FilesAction::Delete { key, no_sync } => {
                commands::run_files_delete(&cfg, &key, no_sync).await?
            }
        },
        Commands::Sync => commands::run_sync(&cfg).await?,
        Commands::Query { query, limit } => commands::run_query(&cfg, &query, limit).await?,
        Commands::HandleEvent { path } => commands::run_handle_event(&cfg, &path).await?,
        Commands::Serve => server::run_server(&cfg).await?,
        Commands::Debug => commands::run_debug(&cfg).await?,
    }

    Ok(())
}
