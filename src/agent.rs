//! Agent conversation and discovery.
//!
//! Every function here degrades instead of failing: remote errors are
//! logged and turned into a visible message or an empty result, so a chat
//! loop never aborts on a single bad call.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::aws::mask_key;
use crate::config::Config;
use crate::context::build_conversation_context;
use crate::error::describe_credential_error;
use crate::models::{
    sort_aliases_newest_first, AgentAlias, AgentDetail, AgentSummary, ChatMessage,
    RetrievalResult,
};
use crate::session::Session;
use crate::traits::{AgentDirectory, AgentRuntime, IdentityProbe, ObjectStore};

/// Input sent when a conversation opens with no history.
pub const GREETING: &str = "Hello";

/// Send `payload` to an agent and return the concatenated reply.
///
/// Chunk bytes are joined before UTF-8 decoding. A reply with no chunks is
/// an empty string. Failures come back as
/// `"Sorry, I encountered an error: <msg>"`.
pub async fn invoke_agent(
    runtime: &dyn AgentRuntime,
    agent_id: &str,
    alias_id: &str,
    payload: &str,
    session_id: &str,
) -> String {
    match runtime
        .invoke_agent(agent_id, alias_id, session_id, payload)
        .await
    {
        Ok(chunks) => String::from_utf8_lossy(&chunks.concat()).into_owned(),
        Err(e) => {
            error!(agent = agent_id, alias = alias_id, error = %e, "failed to invoke agent");
            format!("Sorry, I encountered an error: {}", e)
        }
    }
}

/// One user turn: record the input, ask the selected agent, record the reply.
///
/// The payload is folded from the history as it stood before `input` was
/// added. An empty reply is returned but not recorded.
pub async fn chat_turn(session: &mut Session, runtime: &dyn AgentRuntime, input: &str) -> String {
    let (Some(agent_id), Some(alias_id)) = (
        session.selected_agent_id.clone(),
        session.selected_alias_id.clone(),
    ) else {
        warn!("chat turn without a selected agent");
        return "Please select an agent first.".to_string();
    };

    let payload = build_conversation_context(&session.messages, input);
    session.push(ChatMessage::user(input));

    let reply = invoke_agent(runtime, &agent_id, &alias_id, &payload, &session.session_id).await;
    if reply.is_empty() {
        warn!(session = session.short_id(), "no response received from agent");
    } else {
        session.push(ChatMessage::assistant(reply.clone()));
        session.message_count += 1;
    }
    reply
}

/// Open an empty conversation with [`GREETING`].
///
/// Returns `None` when the session already has messages or no agent is
/// selected.
pub async fn greet(session: &mut Session, runtime: &dyn AgentRuntime) -> Option<String> {
    if !session.messages.is_empty() {
        return None;
    }
    let agent_id = session.selected_agent_id.clone()?;
    let alias_id = session.selected_alias_id.clone()?;

    let reply = invoke_agent(runtime, &agent_id, &alias_id, GREETING, &session.session_id).await;
    session.push(ChatMessage::assistant(reply.clone()));
    session.message_count += 1;
    Some(reply)
}

pub async fn list_agents(directory: &dyn AgentDirectory) -> Vec<AgentSummary> {
    directory.list_agents().await.unwrap_or_else(|e| {
        error!(error = %e, "error listing agents");
        Vec::new()
    })
}

pub async fn get_agent(directory: &dyn AgentDirectory, agent_id: &str) -> Option<AgentDetail> {
    match directory.get_agent(agent_id).await {
        Ok(detail) => Some(detail),
        Err(e) => {
            error!(agent = agent_id, error = %e, "error getting agent details");
            None
        }
    }
}

/// Aliases for `agent_id`, newest first.
pub async fn list_agent_aliases(directory: &dyn AgentDirectory, agent_id: &str) -> Vec<AgentAlias> {
    match directory.list_agent_aliases(agent_id).await {
        Ok(mut aliases) => {
            sort_aliases_newest_first(&mut aliases);
            aliases
        }
        Err(e) => {
            error!(agent = agent_id, error = %e, "error listing agent aliases");
            Vec::new()
        }
    }
}

/// Query the knowledge base directly, bypassing the agent.
pub async fn query_knowledge_base(
    runtime: &dyn AgentRuntime,
    knowledge_base_id: &str,
    query: &str,
    max_results: u32,
) -> Vec<RetrievalResult> {
    match runtime.retrieve(knowledge_base_id, query, max_results).await {
        Ok(results) => {
            info!(kb = knowledge_base_id, hits = results.len(), "knowledge base query");
            results
        }
        Err(e) => {
            error!(kb = knowledge_base_id, error = %e, "failed to query knowledge base");
            Vec::new()
        }
    }
}

/// Result of a credential check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected {
        account: String,
        arn: String,
        user_id: String,
        agent_count: usize,
        region: String,
        credential_method: String,
    },
    Failed {
        error: String,
        region: String,
        credential_method: String,
    },
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected { .. })
    }
}

/// Resolve the caller identity and count the visible agents.
pub async fn check_credentials(
    config: &Config,
    identity: &dyn IdentityProbe,
    directory: &dyn AgentDirectory,
) -> ConnectionStatus {
    let region = config.aws.region.clone();
    let credential_method = config.credential_method().to_string();

    match identity.caller_identity().await {
        Ok(who) => {
            let agents = list_agents(directory).await;
            info!(account = %who.account, agents = agents.len(), "credentials verified");
            ConnectionStatus::Connected {
                account: who.account,
                arn: who.arn,
                user_id: who.user_id,
                agent_count: agents.len(),
                region,
                credential_method,
            }
        }
        Err(e) => {
            warn!(error = %e, "credential check failed");
            ConnectionStatus::Failed {
                error: describe_credential_error(&e.to_string()),
                region,
                credential_method,
            }
        }
    }
}

/// Connection diagnostics with the access key masked.
#[derive(Debug, Clone, Serialize)]
pub struct DebugInfo {
    pub region: String,
    pub has_access_key: bool,
    pub has_secret_key: bool,
    pub access_key_prefix: String,
    pub s3_test: String,
    pub bedrock_test: String,
}

/// Probe storage and the agent service once each.
pub async fn debug_connection(
    config: &Config,
    store: &dyn ObjectStore,
    directory: &dyn AgentDirectory,
) -> DebugInfo {
    let s3_test = match store.list_objects(&config.storage.folder).await {
        Ok(_) => "success".to_string(),
        Err(e) => format!("error: {}", e),
    };
    let bedrock_test = match directory.list_agents().await {
        Ok(_) => "success".to_string(),
        Err(e) => format!("error: {}", e),
    };

    DebugInfo {
        region: config.aws.region.clone(),
        has_access_key: config.aws.access_key_id.is_some(),
        has_secret_key: config.aws.secret_access_key.is_some(),
        access_key_prefix: config
            .aws
            .access_key_id
            .as_deref()
            .map(mask_key)
            .unwrap_or_else(|| "None".to_string()),
        s3_test,
        bedrock_test,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::models::Role;
    use crate::traits::ServiceResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedRuntime {
        replies: Mutex<Vec<ServiceResult<Vec<Vec<u8>>>>>,
        payloads: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedRuntime {
        fn replying(replies: Vec<ServiceResult<Vec<Vec<u8>>>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().rev().collect()),
                payloads: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AgentRuntime for ScriptedRuntime {
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
            self.replies.lock().unwrap().pop().unwrap_or(Ok(Vec::new()))
        }

        async fn retrieve(&self, _: &str, _: &str, _: u32) -> ServiceResult<Vec<RetrievalResult>> {
            Err(ServiceError::decode("bedrock-agent-runtime", "boom"))
        }
    }

    fn chunks(parts: &[&str]) -> ServiceResult<Vec<Vec<u8>>> {
        Ok(parts.iter().map(|s| s.as_bytes().to_vec()).collect())
    }

    fn session_with_agent() -> Session {
        let mut session = Session::new();
        session.select_agent("A1", "Analyst", "TSTALIASID");
        session
    }

    #[tokio::test]
    async fn chunks_concatenate_in_order() {
        let rt = ScriptedRuntime::replying(vec![chunks(&["Hel", "lo", "!"])]);
        assert_eq!(invoke_agent(&rt, "A", "B", "hi", "S").await, "Hello!");
    }

    #[tokio::test]
    async fn multibyte_character_split_between_chunks() {
        let text = "naïve".as_bytes();
        let rt = ScriptedRuntime::replying(vec![Ok(vec![
            text[..3].to_vec(),
            text[3..].to_vec(),
        ])]);
        assert_eq!(invoke_agent(&rt, "A", "B", "hi", "S").await, "naïve");
    }

    #[tokio::test]
    async fn zero_chunks_is_empty_string() {
        let rt = ScriptedRuntime::replying(vec![chunks(&[])]);
        assert_eq!(invoke_agent(&rt, "A", "B", "hi", "S").await, "");
    }

    #[tokio::test]
    async fn failure_becomes_apology() {
        let rt = ScriptedRuntime::replying(vec![Err(ServiceError::Api {
            service: "bedrock-agent-runtime",
            operation: "InvokeAgent",
            status: 403,
            message: "AccessDeniedException: no".into(),
        })]);
        let reply = invoke_agent(&rt, "A", "B", "hi", "S").await;
        assert!(reply.starts_with("Sorry, I encountered an error: "));
        assert!(reply.contains("AccessDeniedException"));
    }

    #[tokio::test]
    async fn chat_turn_folds_prior_history_only() {
        let rt = ScriptedRuntime::replying(vec![chunks(&["first"]), chunks(&["second"])]);
        let mut session = session_with_agent();

        chat_turn(&mut session, &rt, "hi").await;
        chat_turn(&mut session, &rt, "bye").await;

        let payloads = rt.payloads.lock().unwrap();
        assert_eq!(payloads[0].1, "hi");
        assert_eq!(payloads[1].1, "User: hi\n\nAssistant: first\n\nUser: bye");
        assert!(payloads.iter().all(|(sid, _)| *sid == session.session_id));
        assert_eq!(session.messages.len(), 4);
        assert_eq!(session.message_count, 2);
    }

    #[tokio::test]
    async fn empty_reply_is_not_recorded() {
        let rt = ScriptedRuntime::replying(vec![chunks(&[])]);
        let mut session = session_with_agent();
        let reply = chat_turn(&mut session, &rt, "hi").await;
        assert_eq!(reply, "");
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.message_count, 0);
    }

    #[tokio::test]
    async fn chat_turn_requires_agent() {
        let rt = ScriptedRuntime::default();
        let mut session = Session::new();
        let reply = chat_turn(&mut session, &rt, "hi").await;
        assert_eq!(reply, "Please select an agent first.");
        assert!(rt.payloads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn greet_only_on_empty_session() {
        let rt = ScriptedRuntime::replying(vec![chunks(&["Hi there"])]);
        let mut session = session_with_agent();

        assert_eq!(greet(&mut session, &rt).await.as_deref(), Some("Hi there"));
        assert_eq!(rt.payloads.lock().unwrap()[0].1, GREETING);
        assert_eq!(session.messages[0].role, Role::Assistant);
        assert_eq!(greet(&mut session, &rt).await, None);
    }

    #[tokio::test]
    async fn query_failure_is_empty() {
        let rt = ScriptedRuntime::default();
        assert!(query_knowledge_base(&rt, "KB", "q", 5).await.is_empty());
    }
}
