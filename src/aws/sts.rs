//! STS `GetCallerIdentity`, used to verify credentials.

use async_trait::async_trait;
use reqwest::Method;

use super::{extract_xml_value, http_client, Call, Credentials, Endpoint, SignedClient};
use crate::config::Config;
use crate::error::ServiceError;
use crate::models::CallerIdentity;
use crate::traits::{IdentityProbe, ServiceResult};

const SERVICE: &str = "sts";

pub struct StsClient {
    inner: SignedClient,
}

impl StsClient {
    pub fn new(config: &Config, creds: Credentials) -> ServiceResult<Self> {
        let endpoint = match config.aws.sts_endpoint_url {
            Some(ref url) => Endpoint::parse(url),
            None => Endpoint::https(format!("sts.{}.amazonaws.com", config.aws.region)),
        };
        Ok(Self {
            inner: SignedClient {
                http: http_client(config)?,
                creds,
                endpoint,
                region: config.aws.region.clone(),
                service: SERVICE,
                signing_name: SERVICE,
            },
        })
    }
}

#[async_trait]
impl IdentityProbe for StsClient {
    async fn caller_identity(&self) -> ServiceResult<CallerIdentity> {
        let mut call = Call::new("GetCallerIdentity", Method::POST, "/");
        call.headers.push((
            "content-type".to_string(),
            "application/x-www-form-urlencoded; charset=utf-8".to_string(),
        ));
        call.body = b"Action=GetCallerIdentity&Version=2011-06-15".to_vec();

        let resp = self.inner.send(call).await?;
        let xml = resp.text().await.map_err(|source| ServiceError::Transport {
            service: SERVICE,
            source,
        })?;
        parse_caller_identity(&xml)
    }
}

fn parse_caller_identity(xml: &str) -> ServiceResult<CallerIdentity> {
    let arn = extract_xml_value(xml, "Arn")
        .ok_or_else(|| ServiceError::decode(SERVICE, "GetCallerIdentity response has no Arn"))?;
    Ok(CallerIdentity {
        arn,
        account: extract_xml_value(xml, "Account").unwrap_or_else(|| "Unknown".to_string()),
        user_id: extract_xml_value(xml, "UserId").unwrap_or_else(|| "Unknown".to_string()),
    })
}
