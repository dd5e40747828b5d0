//! Bedrock agent runtime (`bedrock-agent-runtime`): `InvokeAgent` and
//! `Retrieve`.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use super::sigv4::uri_encode;
use super::{eventstream, http_client, Call, Credentials, Endpoint, SignedClient};
use crate::config::Config;
use crate::error::ServiceError;
use crate::models::RetrievalResult;
use crate::traits::{AgentRuntime, ServiceResult};

const SERVICE: &str = "bedrock-agent-runtime";

pub struct AgentRuntimeClient {
    inner: SignedClient,
}

impl AgentRuntimeClient {
    pub fn new(config: &Config, creds: Credentials) -> ServiceResult<Self> {
        let endpoint = match config.aws.bedrock_runtime_endpoint_url {
            Some(ref url) => Endpoint::parse(url),
            None => Endpoint::https(format!(
                "bedrock-agent-runtime.{}.amazonaws.com",
                config.aws.region
            )),
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
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveResponse {
    #[serde(default)]
    retrieval_results: Vec<RawRetrievalResult>,
}

#[derive(Deserialize)]
struct RawRetrievalResult {
    #[serde(default)]
    content: Option<RawContent>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    location: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct RawContent {
    #[serde(default)]
    text: String,
}

impl From<RawRetrievalResult> for RetrievalResult {
    fn from(raw: RawRetrievalResult) -> Self {
        RetrievalResult {
            text: raw.content.map(|c| c.text).unwrap_or_default(),
            score: raw.score,
            location: raw.location.as_ref().and_then(location_uri),
        }
    }
}

/// Pull the first `uri`/`url` string out of a location object.
fn location_uri(location: &serde_json::Value) -> Option<String> {
    location.as_object()?.values().find_map(|v| {
        v.get("uri")
            .or_else(|| v.get("url"))
            .and_then(|u| u.as_str())
            .map(str::to_string)
    })
}

#[async_trait]
impl AgentRuntime for AgentRuntimeClient {
    async fn invoke_agent(
        &self,
        agent_id: &str,
        alias_id: &str,
        session_id: &str,
        input_text: &str,
    ) -> ServiceResult<Vec<Vec<u8>>> {
        let path = format!(
            "/agents/{}/agentAliases/{}/sessions/{}/text",
            uri_encode(agent_id),
            uri_encode(alias_id),
            uri_encode(session_id)
        );
        let body = json!({ "inputText": input_text });
        let resp = self
            .inner
            .send(Call::new("InvokeAgent", Method::POST, &path).json(&body))
            .await?;

        let bytes = resp.bytes().await.map_err(|source| ServiceError::Transport {
            service: SERVICE,
            source,
        })?;
        eventstream::decode_chunks(&bytes)
    }

    async fn retrieve(
        &self,
        knowledge_base_id: &str,
        query: &str,
        max_results: u32,
    ) -> ServiceResult<Vec<RetrievalResult>> {
        let path = format!("/knowledgebases/{}/retrieve", uri_encode(knowledge_base_id));
        let body = json!({
            "retrievalQuery": { "text": query },
            "retrievalConfiguration": {
                "vectorSearchConfiguration": { "numberOfResults": max_results }
            }
        });
        let resp = self
            .inner
            .send(Call::new("Retrieve", Method::POST, &path).json(&body))
            .await?;
        let bytes = resp.bytes().await.map_err(|source| ServiceError::Transport {
            service: SERVICE,
            source,
        })?;
        let parsed: RetrieveResponse = serde_json::from_slice(&bytes)
            .map_err(|e| ServiceError::decode(SERVICE, e.to_string()))?;
        Ok(parsed
            .retrieval_results
            .into_iter()
            .map(RetrievalResult::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retrieval_results_flatten_content_and_location() {
        let parsed: RetrieveResponse = serde_json::from_value(json!({
            "retrievalResults": [
                {
                    "content": {"text": "Runbook step 1"},
                    "location": {"type": "S3", "s3Location": {"uri": "s3://kb/upload_files/a.md"}},
                    "score": 0.82
                },
                {"content": {"text": "orphan"}}
            ]
        }))
        .unwrap();
        let results: Vec<RetrievalResult> = parsed
            .retrieval_results
            .into_iter()
            .map(RetrievalResult::from)
            .collect();
        assert_eq!(results[0].text, "Runbook step 1");
        assert_eq!(results[0].location.as_deref(), Some("s3://kb/upload_files/a.md"));
        assert_eq!(results[0].score, Some(0.82));
        assert_eq!(results[1].location, None);
    }
}
