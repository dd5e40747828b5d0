//! Bedrock agent control plane (`bedrock-agent`).
//!
//! Covers agent discovery (`ListAgents`, `GetAgent`, `ListAgentAliases`)
//! and knowledge base administration (`ListDataSources`,
//! `StartIngestionJob`). All operations are REST/JSON; list operations
//! follow `nextToken` until exhausted.

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::sigv4::uri_encode;
use super::{http_client, Call, Credentials, Endpoint, SignedClient};
use crate::config::Config;
use crate::error::ServiceError;
use crate::models::{AgentAlias, AgentDetail, AgentSummary, DataSource, IngestionJob};
use crate::traits::{AgentDirectory, KnowledgeBaseAdmin, ServiceResult};

const SERVICE: &str = "bedrock-agent";

pub struct BedrockAgentClient {
    inner: SignedClient,
}

impl BedrockAgentClient {
    pub fn new(config: &Config, creds: Credentials) -> ServiceResult<Self> {
        let endpoint = match config.aws.bedrock_agent_endpoint_url {
            Some(ref url) => Endpoint::parse(url),
            None => Endpoint::https(format!("bedrock-agent.{}.amazonaws.com", config.aws.region)),
        };
        Ok(Self {
            inner: SignedClient {
                http: http_client(config)?,
                creds,
                endpoint,
                region: config.aws.region.clone(),
                service: SERVICE,
                signing_name: "bedrock",
            },
        })
    }

    async fn call_json<T: DeserializeOwned>(&self, call: Call<'_>) -> ServiceResult<T> {
        let resp = self.inner.send(call).await?;
        let bytes = resp.bytes().await.map_err(|source| ServiceError::Transport {
            service: SERVICE,
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| ServiceError::decode(SERVICE, e.to_string()))
    }

    /// POST a list request repeatedly, collecting `field` from each page.
    async fn list_all<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        field: &str,
    ) -> ServiceResult<Vec<T>> {
        let mut items = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut body = json!({ "maxResults": 100 });
            if let Some(ref token) = next_token {
                body["nextToken"] = json!(token);
            }
            let page: Value = self
                .call_json(Call::new(operation, Method::POST, path).json(&body))
                .await?;

            if let Some(list) = page.get(field) {
                let batch: Vec<T> = serde_json::from_value(list.clone())
                    .map_err(|e| ServiceError::decode(SERVICE, e.to_string()))?;
                items.extend(batch);
            }

            match page.get("nextToken").and_then(|t| t.as_str()) {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(items)
    }
}

#[derive(Deserialize)]
struct GetAgentResponse {
    agent: AgentDetail,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartIngestionJobResponse {
    ingestion_job: IngestionJobBody,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngestionJobBody {
    ingestion_job_id: String,
}

#[async_trait]
impl AgentDirectory for BedrockAgentClient {
    async fn list_agents(&self) -> ServiceResult<Vec<AgentSummary>> {
        self.list_all("ListAgents", "/agents/", "agentSummaries")
            .await
    }

    async fn get_agent(&self, agent_id: &str) -> ServiceResult<AgentDetail> {
        let path = format!("/agents/{}/", uri_encode(agent_id));
        let resp: GetAgentResponse = self
            .call_json(Call::new("GetAgent", Method::GET, &path))
            .await?;
        Ok(resp.agent)
    }

    async fn list_agent_aliases(&self, agent_id: &str) -> ServiceResult<Vec<AgentAlias>> {
        let path = format!("/agents/{}/agentaliases/", uri_encode(agent_id));
        self.list_all("ListAgentAliases", &path, "agentAliasSummaries")
            .await
    }
}

#[async_trait]
impl KnowledgeBaseAdmin for BedrockAgentClient {
    async fn list_data_sources(&self, knowledge_base_id: &str) -> ServiceResult<Vec<DataSource>> {
        let path = format!("/knowledgebases/{}/datasources/", uri_encode(knowledge_base_id));
        self.list_all("ListDataSources", &path, "dataSourceSummaries")
            .await
    }

    async fn start_ingestion_job(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
    ) -> ServiceResult<IngestionJob> {
        let path = format!(
            "/knowledgebases/{}/datasources/{}/ingestionjobs/",
            uri_encode(knowledge_base_id),
            uri_encode(data_source_id)
        );
        let body = json!({ "clientToken": Uuid::new_v4().to_string() });
        let resp: StartIngestionJobResponse = self
            .call_json(Call::new("StartIngestionJob", Method::PUT, &path).json(&body))
            .await?;
        Ok(IngestionJob {
            job_id: resp.ingestion_job.ingestion_job_id,
        })
    }
}
