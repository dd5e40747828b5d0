//! Decoder for `application/vnd.amazon.eventstream` response bodies.
//!
//! Each message is framed as:
//!
//! ```text
//! [total_len u32][headers_len u32][prelude_crc u32][headers][payload][message_crc u32]
//! ```
//!
//! Headers are `[name_len u8][name][type u8][value]`. CRCs are not
//! verified.

use std::collections::HashMap;

use base64::Engine as _;

use crate::error::ServiceError;
use crate::traits::ServiceResult;

const PRELUDE_LEN: usize = 12;
const TRAILER_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub headers: HashMap<String, String>,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Split a complete response body into messages.
pub fn decode_messages(mut buf: &[u8]) -> ServiceResult<Vec<Message>> {
    let mut messages = Vec::new();
    while !buf.is_empty() {
        if buf.len() < PRELUDE_LEN + TRAILER_LEN {
            return Err(truncated("prelude"));
        }
        let total_len = read_u32(&buf[0..4]) as usize;
        let headers_len = read_u32(&buf[4..8]) as usize;
        if total_len > buf.len() || total_len < PRELUDE_LEN + headers_len + TRAILER_LEN {
            return Err(truncated("message"));
        }

        let headers_end = PRELUDE_LEN + headers_len;
        let headers = decode_headers(&buf[PRELUDE_LEN..headers_end])?;
        let payload = buf[headers_end..total_len - TRAILER_LEN].to_vec();
        messages.push(Message { headers, payload });
        buf = &buf[total_len..];
    }
    Ok(messages)
}

/// Extract the payload bytes of every `chunk` event, in order.
///
/// Chunks are not decoded as text individually: a UTF-8 sequence may be
/// split across two of them. An `exception` message aborts with its error
/// type and message.
pub fn decode_chunks(body: &[u8]) -> ServiceResult<Vec<Vec<u8>>> {
    let mut chunks = Vec::new();
    for message in decode_messages(body)? {
        if matches!(message.header(":message-type"), Some("exception" | "error")) {
            let kind = message
                .header(":exception-type")
                .or_else(|| message.header(":error-code"))
                .unwrap_or("UnknownException");
            let detail = serde_json::from_slice::<serde_json::Value>(&message.payload)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or_else(|| String::from_utf8_lossy(&message.payload).into_owned());
            return Err(ServiceError::Api {
                service: "bedrock-agent-runtime",
                operation: "InvokeAgent",
                status: 200,
                message: format!("{}: {}", kind, detail),
            });
        }

        if message.header(":event-type") != Some("chunk") {
            continue;
        }
        let event: serde_json::Value = serde_json::from_slice(&message.payload)
            .map_err(|e| ServiceError::decode("bedrock-agent-runtime", e.to_string()))?;
        let Some(encoded) = event.get("bytes").and_then(|b| b.as_str()) else {
            continue;
        };
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| ServiceError::decode("bedrock-agent-runtime", e.to_string()))?;
        chunks.push(bytes);
    }
    Ok(chunks)
}

fn decode_headers(mut buf: &[u8]) -> ServiceResult<HashMap<String, String>> {
    let mut headers = HashMap::new();
    while !buf.is_empty() {
        let name_len = buf[0] as usize;
        let name_end = 1 + name_len;
        if buf.len() < name_end + 1 {
            return Err(truncated("header name"));
        }
        let name = String::from_utf8_lossy(&buf[1..name_end]).into_owned();
        let value_type = buf[name_end];
        let rest = &buf[name_end + 1..];

        let (value, used) = match value_type {
            0 => ("true".to_string(), 0),
            1 => ("false".to_string(), 0),
            2 => fixed(rest, 1)?,
            3 => fixed(rest, 2)?,
            4 => fixed(rest, 4)?,
            5 | 8 => fixed(rest, 8)?,
            9 => fixed(rest, 16)?,
            6 | 7 => {
                if rest.len() < 2 {
                    return Err(truncated("header value"));
                }
                let len = u16::from_be_bytes([rest[0], rest[1]]) as usize;
                if rest.len() < 2 + len {
                    return Err(truncated("header value"));
                }
                (String::from_utf8_lossy(&rest[2..2 + len]).into_owned(), 2 + len)
            }
            other => {
                return Err(ServiceError::decode(
                    "eventstream",
                    format!("unknown header value type {}", other),
                ))
            }
        };

        headers.insert(name, value);
        buf = &rest[used..];
    }
    Ok(headers)
}

/// Fixed-width header values are kept as hex; only string headers matter here.
fn fixed(rest: &[u8], len: usize) -> ServiceResult<(String, usize)> {
    if rest.len() < len {
        return Err(truncated("header value"));
    }
    Ok((hex::encode(&rest[..len]), len))
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn truncated(what: &str) -> ServiceError {
    ServiceError::decode("eventstream", format!("truncated {}", what))
}

/// Encode a message the way the service frames it (CRCs left as zero).
#[cfg(test)]
pub(crate) fn encode_message(headers: &[(&str, &str)], payload: &[u8]) -> Vec<u8> {
    let mut header_bytes = Vec::new();
    for (name, value) in headers {
        header_bytes.push(name.len() as u8);
        header_bytes.extend_from_slice(name.as_bytes());
        header_bytes.push(7);
        header_bytes.extend_from_slice(&(value.len() as u16).to_be_bytes());
        header_bytes.extend_from_slice(value.as_bytes());
    }
    let total = PRELUDE_LEN + header_bytes.len() + payload.len() + TRAILER_LEN;
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&(total as u32).to_be_bytes());
    out.extend_from_slice(&(header_bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&header_bytes);
    out.extend_from_slice(payload);
    out.extend_from_slice(&[0; 4]);
    out
}

#[cfg(test)]
pub(crate) fn chunk_event(bytes: impl AsRef<[u8]>) -> Vec<u8> {
    let payload = serde_json::json!({
        "bytes": base64::engine::general_purpose::STANDARD.encode(bytes),
    });
    encode_message(
        &[(":message-type", "event"), (":event-type", "chunk")],
        payload.to_string().as_bytes(),
    )
}
