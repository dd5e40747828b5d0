//! Interactive chat loop for `kbchat chat`.
//!
//! Reads one line per turn from stdin. Lines starting with `/` are
//! commands:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `/new` | Start a new session with the same agent |
//! | `/agent <id> [alias]` | Switch agent, keeping the conversation |
//! | `/disconnect` | Drop the agent and the conversation |
//! | `/summary` | Print a short summary of the conversation |
//! | `/status` | Print session id, agent, and message counts |
//! | `/quit` | Exit |

use anyhow::{bail, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::agent;
use crate::aws::AwsClients;
use crate::config::Config;
use crate::context::conversation_summary;
use crate::format::render_reply;
use crate::session::Session;
use crate::traits::AgentDirectory;

/// Alias to chat through: `explicit`, else the newest alias when `latest`,
/// else the configured default.
pub async fn resolve_alias(
    directory: &dyn AgentDirectory,
    config: &Config,
    agent_id: &str,
    explicit: Option<&str>,
    latest: bool,
) -> String {
    if let Some(alias) = explicit {
        return alias.to_string();
    }
    if latest {
        if let Some(newest) = agent::list_agent_aliases(directory, agent_id).await.first() {
            return newest.agent_alias_id.clone();
        }
    }
    config.agent.alias_id.clone()
}

async fn select(
    session: &mut Session,
    clients: &AwsClients,
    config: &Config,
    agent_id: &str,
    alias: Option<&str>,
    latest: bool,
) {
    let name = agent::get_agent(&clients.bedrock, agent_id)
        .await
        .map(|d| d.agent_name)
        .unwrap_or_else(|| agent_id.to_string());
    let alias_id = resolve_alias(&clients.bedrock, config, agent_id, alias, latest).await;
    session.select_agent(agent_id, &name, &alias_id);
    println!("Using agent '{}' ({}) via alias {}", name, agent_id, alias_id);
}

pub async fn run_chat(
    config: &Config,
    agent_id: Option<&str>,
    alias: Option<&str>,
    latest_alias: bool,
) -> Result<()> {
    let agent_id = agent_id.unwrap_or(&config.agent.agent_id).to_string();
    if agent_id.is_empty() {
        bail!("No agent selected: pass --agent or set agent.agent_id");
    }

    let clients = AwsClients::connect(config)?;
    let mut session = Session::new();
    select(&mut session, &clients, config, &agent_id, alias, latest_alias).await;
    println!("Session {}. Type /quit to exit.\n", session.short_id());

    if let Some(greeting) = agent::greet(&mut session, &clients.runtime).await {
        print_reply(&greeting);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if let Some(command) = input.strip_prefix('/') {
            let mut parts = command.split_whitespace();
            match parts.next().unwrap_or("") {
                "quit" | "exit" => break,
                "new" => {
                    session = session.reset();
                    println!("New session {}.", session.short_id());
                    if let Some(greeting) = agent::greet(&mut session, &clients.runtime).await {
                        print_reply(&greeting);
                    }
                }
                "agent" => match parts.next() {
                    Some(id) => {
                        select(&mut session, &clients, config, id, parts.next(), latest_alias).await
                    }
                    None => println!("Usage: /agent <id> [alias]"),
                },
                "disconnect" => {
                    session = session.disconnect();
                    println!("Disconnected. Select an agent with /agent <id>.");
                }
                "summary" => println!("{}", conversation_summary(&session.messages)),
                "status" => {
                    println!("Session:  {}", session.session_id);
                    println!(
                        "Agent:    {}",
                        session.selected_agent_name.as_deref().unwrap_or("(none)")
                    );
                    println!("Messages: {}", session.message_count);
                    println!("Duration: {}s", session.duration().num_seconds());
                }
                other => println!("Unknown command: /{}", other),
            }
            continue;
        }

        let reply = agent::chat_turn(&mut session, &clients.runtime, input).await;
        if reply.is_empty() {
            println!("(no response received from agent)\n");
        } else {
            print_reply(&reply);
        }
    }
    Ok(())
}

fn print_reply(reply: &str) {
    println!("{}\n", render_reply(reply));
}

async fn prompt() -> Result<()> {
    let mut out = tokio::io::stdout();
    out.write_all(b"> ").await?;
    out.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgentAlias, AgentDetail, AgentSummary};
    use crate::traits::ServiceResult;
    use async_trait::async_trait;

    struct Directory(Vec<AgentAlias>);

    #[async_trait]
    impl AgentDirectory for Directory {
        async fn list_agents(&self) -> ServiceResult<Vec<AgentSummary>> {
            Ok(Vec::new())
        }
        async fn get_agent(&self, _id: &str) -> ServiceResult<AgentDetail> {
            Err(crate::error::ServiceError::decode("bedrock-agent", "missing"))
        }
        async fn list_agent_aliases(&self, _id: &str) -> ServiceResult<Vec<AgentAlias>> {
            Ok(self.0.clone())
        }
    }

    fn alias(id: &str, updated: &str) -> AgentAlias {
        AgentAlias {
            agent_alias_id: id.into(),
            agent_alias_name: id.into(),
            agent_alias_status: Some("PREPARED".into()),
            created_at: None,
            updated_at: Some(updated.into()),
        }
    }

    #[tokio::test]
    async fn alias_resolution_order() {
        let dir = Directory(vec![
            alias("OLD", "2024-01-01T00:00:00Z"),
            alias("NEW", "2024-05-01T00:00:00Z"),
        ]);
        let config = Config::default();

        assert_eq!(resolve_alias(&dir, &config, "A", Some("X"), true).await, "X");
        assert_eq!(resolve_alias(&dir, &config, "A", None, true).await, "NEW");
        assert_eq!(resolve_alias(&dir, &config, "A", None, false).await, "TSTALIASID");

        let empty = Directory(Vec::new());
        assert_eq!(resolve_alias(&empty, &config, "A", None, true).await, "TSTALIASID");
    }
}
