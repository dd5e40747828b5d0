//! AWS Signature Version 4.
//!
//! Pure-Rust signing (`hmac` + `sha2`) for both header-authenticated
//! requests and pre-signed query-string URLs.
//!
//! See <https://docs.aws.amazon.com/IAM/latest/UserGuide/reference_sigv4-create-signed-request.html>.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use super::Credentials;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// The parts of an HTTP request that go into the signature.
pub struct SignableRequest<'a> {
    pub method: &'a str,
    pub host: &'a str,
    /// Request path as sent on the wire (already percent-encoded).
    pub path: &'a str,
    pub query: &'a [(String, String)],
    /// Additional headers to sign; names must be lowercase.
    pub headers: &'a [(String, String)],
    pub payload: &'a [u8],
}

/// Signing scope: region plus the service signing name (`s3`, `bedrock`, `sts`).
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub region: &'a str,
    pub service: &'a str,
}

/// Sign `req` and return the headers to attach (`authorization`,
/// `x-amz-date`, `x-amz-content-sha256`, and the session token if any).
pub fn sign(
    req: &SignableRequest<'_>,
    creds: &Credentials,
    scope: Scope<'_>,
    now: DateTime<Utc>,
) -> Vec<(String, String)> {
    let date_stamp = now.format("%Y%m%d").to_string();
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let payload_hash = hex_sha256(req.payload);

    let mut headers: Vec<(String, String)> = vec![
        ("host".to_string(), req.host.to_string()),
        ("x-amz-content-sha256".to_string(), payload_hash.clone()),
        ("x-amz-date".to_string(), amz_date.clone()),
    ];
    if let Some(ref token) = creds.session_token {
        headers.push(("x-amz-security-token".to_string(), token.clone()));
    }
    headers.extend(
        req.headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.trim().to_string())),
    );
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    let signed_headers = signed_header_list(&headers);
    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v))
        .collect();

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        req.method,
        canonical_uri(req.path, scope.service),
        canonical_query(req.query),
        canonical_headers,
        signed_headers,
        payload_hash
    );

    let credential_scope = credential_scope(&date_stamp, scope);
    let signature = signature(
        &creds.secret_access_key,
        &date_stamp,
        scope,
        &amz_date,
        &credential_scope,
        &canonical_request,
    );

    let authorization = format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        ALGORITHM, creds.access_key_id, credential_scope, signed_headers, signature
    );

    let mut out = vec![
        ("authorization".to_string(), authorization),
        ("x-amz-date".to_string(), amz_date),
        ("x-amz-content-sha256".to_string(), payload_hash),
    ];
    if let Some(ref token) = creds.session_token {
        out.push(("x-amz-security-token".to_string(), token.clone()));
    }
    out
}

/// Build a pre-signed GET URL valid for `expires_secs`.
///
/// Only the `host` header is signed and the payload is `UNSIGNED-PAYLOAD`,
/// matching what browsers and `curl` send.
pub fn presign_url(
    scheme: &str,
    host: &str,
    path: &str,
    creds: &Credentials,
    scope: Scope<'_>,
    expires_secs: u64,
    now: DateTime<Utc>,
) -> String {
    let date_stamp = now.format("%Y%m%d").to_string();
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let credential_scope = credential_scope(&date_stamp, scope);

    let mut query = vec![
        ("X-Amz-Algorithm".to_string(), ALGORITHM.to_string()),
        (
            "X-Amz-Credential".to_string(),
            format!("{}/{}", creds.access_key_id, credential_scope),
        ),
        ("X-Amz-Date".to_string(), amz_date.clone()),
        ("X-Amz-Expires".to_string(), expires_secs.to_string()),
        ("X-Amz-SignedHeaders".to_string(), "host".to_string()),
    ];
    if let Some(ref token) = creds.session_token {
        query.push(("X-Amz-Security-Token".to_string(), token.clone()));
    }

    let canonical_querystring = canonical_query(&query);
    let canonical_request = format!(
        "GET\n{}\n{}\nhost:{}\n\nhost\n{}",
        canonical_uri(path, scope.service),
        canonical_querystring,
        host,
        UNSIGNED_PAYLOAD
    );

    let signature = signature(
        &creds.secret_access_key,
        &date_stamp,
        scope,
        &amz_date,
        &credential_scope,
        &canonical_request,
    );

    format!(
        "{}://{}{}?{}&X-Amz-Signature={}",
        scheme, host, path, canonical_querystring, signature
    )
}

fn signature(
    secret_key: &str,
    date_stamp: &str,
    scope: Scope<'_>,
    amz_date: &str,
    credential_scope: &str,
    canonical_request: &str,
) -> String {
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        credential_scope,
        hex_sha256(canonical_request.as_bytes())
    );
    let signing_key = derive_signing_key(secret_key, date_stamp, scope.region, scope.service);
    hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()))
}

fn credential_scope(date_stamp: &str, scope: Scope<'_>) -> String {
    format!(
        "{}/{}/{}/aws4_request",
        date_stamp, scope.region, scope.service
    )
}

fn signed_header_list(headers: &[(String, String)]) -> String {
    headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";")
}

/// Canonical URI for the signature.
///
/// S3 signs the path as sent. Every other service signs the path with each
/// segment encoded a second time.
fn canonical_uri(path: &str, service: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    if service == "s3" {
        return path.to_string();
    }
    path.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

/// Sorted, encoded `k=v&...` query string.
pub fn canonical_query(params: &[(String, String)]) -> String {
    let mut sorted: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (uri_encode(k), uri_encode(v)))
        .collect();
    sorted.sort();
    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Compute the hex-encoded SHA-256 hash of data.
pub fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Derive the signing key for a date, region, and service.
///
/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
pub fn derive_signing_key(
    secret_key: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// URI-encode a string per RFC 3986, leaving only `A-Z a-z 0-9 - _ . ~`.
pub fn uri_encode(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

/// Encode an object key for a URL path, keeping `/` separators.
pub fn encode_key(key: &str) -> String {
    key.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}
