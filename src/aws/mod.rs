//! AWS implementations of the collaborator traits.
//!
//! All requests go over `reqwest` and are signed with SigV4 by
//! [`sigv4`]; there is no dependency on the AWS SDK.
//!
//! | Client | Trait(s) | Endpoint | Signing name |
//! |--------|----------|----------|--------------|
//! | [`S3Client`] | `ObjectStore` | `<bucket>.s3.<region>.amazonaws.com` | `s3` |
//! | [`BedrockAgentClient`] | `AgentDirectory`, `KnowledgeBaseAdmin` | `bedrock-agent.<region>.amazonaws.com` | `bedrock` |
//! | [`AgentRuntimeClient`] | `AgentRuntime` | `bedrock-agent-runtime.<region>.amazonaws.com` | `bedrock` |
//! | [`StsClient`] | `IdentityProbe` | `sts.<region>.amazonaws.com` | `sts` |

pub mod bedrock;
pub mod eventstream;
pub mod runtime;
pub mod s3;
pub mod sigv4;
pub mod sts;

pub use bedrock::BedrockAgentClient;
pub use runtime::AgentRuntimeClient;
pub use s3::S3Client;
pub use sts::StsClient;

use chrono::Utc;
use std::time::Duration;

use crate::config::Config;
use crate::error::ServiceError;
use crate::traits::ServiceResult;
use sigv4::{Scope, SignableRequest};

/// An access key pair, optionally with a session token.
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &mask_key(&self.access_key_id))
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Credentials {
    /// Explicit pair from config, otherwise the standard environment variables.
    pub fn resolve(config: &Config) -> ServiceResult<Self> {
        if let (Some(id), Some(secret)) = (&config.aws.access_key_id, &config.aws.secret_access_key)
        {
            return Ok(Self {
                access_key_id: id.clone(),
                secret_access_key: secret.clone(),
                session_token: config.aws.session_token.clone(),
            });
        }
        Self::from_env()
    }

    /// Load from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, and
    /// optionally `AWS_SESSION_TOKEN`.
    pub fn from_env() -> ServiceResult<Self> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID").map_err(|_| {
            ServiceError::Credentials("AWS_ACCESS_KEY_ID environment variable not set".into())
        })?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY").map_err(|_| {
            ServiceError::Credentials("AWS_SECRET_ACCESS_KEY environment variable not set".into())
        })?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

/// One client per service, sharing credentials.
pub struct AwsClients {
    pub s3: S3Client,
    pub bedrock: BedrockAgentClient,
    pub runtime: AgentRuntimeClient,
    pub sts: StsClient,
}

impl AwsClients {
    pub fn connect(config: &Config) -> ServiceResult<Self> {
        let creds = Credentials::resolve(config)?;
        tracing::debug!(region = %config.aws.region, ?creds, "building AWS clients");
        Ok(Self {
            s3: S3Client::new(config, creds.clone())?,
            bedrock: BedrockAgentClient::new(config, creds.clone())?,
            runtime: AgentRuntimeClient::new(config, creds.clone())?,
            sts: StsClient::new(config, creds)?,
        })
    }
}

/// First four characters of a key followed by `...`.
pub fn mask_key(key: &str) -> String {
    let prefix: String = key.chars().take(4).collect();
    format!("{}...", prefix)
}

/// Scheme and host a client sends requests to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub scheme: String,
    pub host: String,
}

impl Endpoint {
    pub fn https(host: impl Into<String>) -> Self {
        Self {
            scheme: "https".to_string(),
            host: host.into(),
        }
    }

    /// Parse an override such as `http://localhost:4566/`.
    pub fn parse(url: &str) -> Self {
        let (scheme, rest) = match url.split_once("://") {
            Some((scheme, rest)) => (scheme.to_string(), rest),
            None => ("https".to_string(), url),
        };
        Self {
            scheme,
            host: rest.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, path_and_query: &str) -> String {
        format!("{}://{}{}", self.scheme, self.host, path_and_query)
    }
}

/// Build the shared HTTP client with the configured timeouts.
pub fn http_client(config: &Config) -> ServiceResult<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.http.connect_timeout_secs))
        .timeout(Duration::from_secs(config.http.read_timeout_secs))
        .build()
        .map_err(|source| ServiceError::Transport {
            service: "http",
            source,
        })
}

/// Everything needed to sign and send a request to one service.
#[derive(Debug, Clone)]
pub(crate) struct SignedClient {
    pub http: reqwest::Client,
    pub creds: Credentials,
    pub endpoint: Endpoint,
    pub region: String,
    pub service: &'static str,
    pub signing_name: &'static str,
}

pub(crate) struct Call<'a> {
    pub operation: &'static str,
    pub method: reqwest::Method,
    pub path: &'a str,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl<'a> Call<'a> {
    pub fn new(operation: &'static str, method: reqwest::Method, path: &'a str) -> Self {
        Self {
            operation,
            method,
            path,
            query: Vec::new(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn json(mut self, value: &serde_json::Value) -> Self {
        self.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        self.body = value.to_string().into_bytes();
        self
    }
}

impl SignedClient {
    /// Sign and send `call`, returning the response if it succeeded.
    ///
    /// Non-2xx responses become [`ServiceError::Api`] with the service's
    /// error code and message folded into the text, so credential
    /// classification can match on it.
    pub async fn send(&self, call: Call<'_>) -> ServiceResult<reqwest::Response> {
        let signed = sigv4::sign(
            &SignableRequest {
                method: call.method.as_str(),
                host: &self.endpoint.host,
                path: call.path,
                query: &call.query,
                headers: &call.headers,
                payload: &call.body,
            },
            &self.creds,
            Scope {
                region: &self.region,
                service: self.signing_name,
            },
            Utc::now(),
        );

        let url = if call.query.is_empty() {
            self.endpoint.url(call.path)
        } else {
            self.endpoint.url(&format!(
                "{}?{}",
                call.path,
                sigv4::canonical_query(&call.query)
            ))
        };

        let mut builder = self.http.request(call.method.clone(), &url);
        for (k, v) in call.headers.iter().chain(signed.iter()) {
            builder = builder.header(k.as_str(), v.as_str());
        }

        tracing::debug!(
            service = self.service,
            operation = call.operation,
            %url,
            "sending request"
        );

        let resp = builder
            .body(call.body)
            .send()
            .await
            .map_err(|source| ServiceError::Transport {
                service: self.service,
                source,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let error_type = resp
                .headers()
                .get("x-amzn-errortype")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.split(':').next().unwrap_or(v).to_string());
            let body = resp.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                service: self.service,
                operation: call.operation,
                status,
                message: error_message(error_type.as_deref(), &body),
            });
        }

        Ok(resp)
    }
}

/// Combine an error type header with a JSON or XML error body.
fn error_message(error_type: Option<&str>, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("Message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .or_else(|| {
            let code = extract_xml_value(body, "Code");
            let message = extract_xml_value(body, "Message");
            match (code, message) {
                (Some(c), Some(m)) => Some(format!("{}: {}", c, m)),
                (Some(c), None) => Some(c),
                (None, m) => m,
            }
        })
        .unwrap_or_else(|| body.chars().take(500).collect());

    match error_type {
        Some(t) if !detail.contains(t) => format!("{}: {}", t, detail),
        _ => detail,
    }
}

/// Extract the text content of an XML tag (simple, non-nested).
pub(crate) fn extract_xml_value(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)?;
    Some(xml_unescape(&xml[start..start + end]))
}

fn xml_unescape(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
