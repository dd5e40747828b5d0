//! Amazon S3 object store.
//!
//! Talks to the S3 REST API directly: `PutObject`, `GetObject`,
//! `ListObjectsV2` (with continuation-token pagination), `DeleteObject`,
//! and pre-signed `GetObject` URLs.
//!
//! Without an endpoint override, requests use virtual-hosted addressing
//! (`<bucket>.s3.<region>.amazonaws.com/<key>`). With an override
//! (MinIO, LocalStack) they use path-style addressing
//! (`<endpoint>/<bucket>/<key>`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;

use super::sigv4::{self, Scope};
use super::{extract_xml_value, http_client, Call, Credentials, Endpoint, SignedClient};
use crate::config::Config;
use crate::error::ServiceError;
use crate::models::{folder_of, StoredObject};
use crate::traits::{ObjectStore, PutRequest, ServiceResult};

const SERVICE: &str = "s3";

pub struct S3Client {
    inner: SignedClient,
    bucket: String,
    path_style: bool,
}

impl S3Client {
    pub fn new(config: &Config, creds: Credentials) -> ServiceResult<Self> {
        let bucket = config.storage.bucket.clone();
        let (endpoint, path_style) = match config.aws.s3_endpoint_url {
            Some(ref url) => (Endpoint::parse(url), true),
            None => (
                Endpoint::https(format!("{}.s3.{}.amazonaws.com", bucket, config.aws.region)),
                false,
            ),
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
            bucket,
            path_style,
        })
    }

    /// Request path for `key` (or the bucket root when `key` is empty).
    fn object_path(&self, key: &str) -> String {
        let encoded = sigv4::encode_key(key);
        if self.path_style {
            format!("/{}/{}", sigv4::uri_encode(&self.bucket), encoded)
        } else {
            format!("/{}", encoded)
        }
    }

    fn ensure_bucket(&self) -> ServiceResult<()> {
        if self.bucket.is_empty() {
            return Err(ServiceError::Api {
                service: SERVICE,
                operation: "configuration",
                status: 400,
                message: "no bucket configured (set S3_BUCKET)".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_object(&self, request: PutRequest) -> ServiceResult<()> {
        self.ensure_bucket()?;
        let path = self.object_path(&request.key);
        let mut call = Call::new("PutObject", Method::PUT, &path);
        call.headers
            .push(("content-type".to_string(), request.content_type.clone()));
        for (name, value) in &request.metadata {
            call.headers
                .push((format!("x-amz-meta-{}", name.to_ascii_lowercase()), value.clone()));
        }
        call.body = request.body;

        self.inner.send(call).await?;
        tracing::info!(bucket = %self.bucket, key = %request.key, "object uploaded");
        Ok(())
    }

    async fn get_object(&self, key: &str) -> ServiceResult<Vec<u8>> {
        self.ensure_bucket()?;
        let path = self.object_path(key);
        let resp = self
            .inner
            .send(Call::new("GetObject", Method::GET, &path))
            .await?;
        let bytes = resp.bytes().await.map_err(|source| ServiceError::Transport {
            service: SERVICE,
            source,
        })?;
        Ok(bytes.to_vec())
    }

    async fn list_objects(&self, prefix: &str) -> ServiceResult<Vec<StoredObject>> {
        self.ensure_bucket()?;
        let path = if self.path_style {
            format!("/{}", sigv4::uri_encode(&self.bucket))
        } else {
            "/".to_string()
        };

        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut call = Call::new("ListObjectsV2", Method::GET, &path);
            call.query = vec![
                ("list-type".to_string(), "2".to_string()),
                ("max-keys".to_string(), "1000".to_string()),
            ];
            if !prefix.is_empty() {
                call.query.push(("prefix".to_string(), prefix.to_string()));
            }
            if let Some(ref token) = continuation_token {
                call.query
                    .push(("continuation-token".to_string(), token.clone()));
            }

            let resp = self.inner.send(call).await?;
            let xml = resp.text().await.map_err(|source| ServiceError::Transport {
                service: SERVICE,
                source,
            })?;
            let page = parse_list_objects_response(&xml);
            objects.extend(page.objects);

            match (page.is_truncated, page.next_token) {
                (true, Some(token)) => continuation_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!(bucket = %self.bucket, prefix, count = objects.len(), "listed objects");
        Ok(objects)
    }

    async fn delete_object(&self, key: &str) -> ServiceResult<()> {
        self.ensure_bucket()?;
        let path = self.object_path(key);
        self.inner
            .send(Call::new("DeleteObject", Method::DELETE, &path))
            .await?;
        tracing::info!(bucket = %self.bucket, key, "object deleted");
        Ok(())
    }

    fn presign_get(&self, key: &str, expires_secs: u64) -> ServiceResult<String> {
        self.ensure_bucket()?;
        Ok(sigv4::presign_url(
            &self.inner.endpoint.scheme,
            &self.inner.endpoint.host,
            &self.object_path(key),
            &self.inner.creds,
            Scope {
                region: &self.inner.region,
                service: SERVICE,
            },
            expires_secs,
            Utc::now(),
        ))
    }
}

struct ListPage {
    objects: Vec<StoredObject>,
    is_truncated: bool,
    next_token: Option<String>,
}

/// Parse a `ListObjectsV2` response, skipping folder marker keys.
fn parse_list_objects_response(xml: &str) -> ListPage {
    let mut objects = Vec::new();
    let is_truncated = extract_xml_value(xml, "IsTruncated")
        .map(|v| v == "true")
        .unwrap_or(false);
    let next_token = extract_xml_value(xml, "NextContinuationToken");

    let mut remaining = xml;
    while let Some(start) = remaining.find("<Contents>") {
        let block_start = start + "<Contents>".len();
        let Some(end) = remaining[block_start..].find("</Contents>") else {
            break;
        };
        let block = &remaining[block_start..block_start + end];
        remaining = &remaining[block_start + end + "</Contents>".len()..];

        let key = extract_xml_value(block, "Key").unwrap_or_default();
        if key.is_empty() || key.ends_with('/') {
            continue;
        }

        let last_modified = extract_xml_value(block, "LastModified")
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_default();

        let size = extract_xml_value(block, "Size")
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0);

        objects.push(StoredObject {
            folder: folder_of(&key),
            key,
            size,
            last_modified,
        });
    }

    ListPage {
        objects,
        is_truncated,
        next_token,
    }
}
