//! Error types for remote calls and credential diagnostics.

use thiserror::Error;

/// Failure talking to a remote service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} {operation} failed (HTTP {status}): {message}")]
    Api {
        service: &'static str,
        operation: &'static str,
        status: u16,
        message: String,
    },
    #[error("{service} returned an unexpected response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },
    #[error("missing credentials: {0}")]
    Credentials(String),
}

impl ServiceError {
    pub fn decode(service: &'static str, message: impl Into<String>) -> Self {
        Self::Decode {
            service,
            message: message.into(),
        }
    }
}

/// Human-readable category for an authentication failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialIssue {
    InvalidAccessKeyId,
    InvalidSecretKey,
    AccessDenied,
    Expired,
}

impl CredentialIssue {
    pub fn message(self) -> &'static str {
        match self {
            CredentialIssue::InvalidAccessKeyId => {
                "Invalid Access Key ID - Please check your credentials"
            }
            CredentialIssue::InvalidSecretKey => {
                "Invalid Secret Access Key - Please check your credentials"
            }
            CredentialIssue::AccessDenied => "Access Denied - Please check your IAM permissions",
            CredentialIssue::Expired => "Credentials have expired - Please refresh your credentials",
        }
    }
}

/// Classify a service error message by the error codes it mentions.
pub fn classify_credential_error(message: &str) -> Option<CredentialIssue> {
    if message.contains("InvalidClientTokenId") || message.contains("InvalidAccessKeyId") {
        Some(CredentialIssue::InvalidAccessKeyId)
    } else if message.contains("SignatureDoesNotMatch") {
        Some(CredentialIssue::InvalidSecretKey)
    } else if message.contains("AccessDenied") {
        Some(CredentialIssue::AccessDenied)
    } else if message.contains("ExpiredToken") {
        Some(CredentialIssue::Expired)
    } else {
        None
    }
}

/// The classified message when one applies, otherwise `message` itself.
pub fn describe_credential_error(message: &str) -> String {
    classify_credential_error(message)
        .map(|issue| issue.message().to_string())
        .unwrap_or_else(|| message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_codes() {
        assert_eq!(
            classify_credential_error("An error occurred (InvalidClientTokenId) when calling"),
            Some(CredentialIssue::InvalidAccessKeyId)
        );
        assert_eq!(
            classify_credential_error("<Code>SignatureDoesNotMatch</Code>"),
            Some(CredentialIssue::InvalidSecretKey)
        );
        assert_eq!(
            classify_credential_error("AccessDeniedException: not authorized"),
            Some(CredentialIssue::AccessDenied)
        );
        assert_eq!(
            classify_credential_error("ExpiredTokenException"),
            Some(CredentialIssue::Expired)
        );
    }

    #[test]
    fn unknown_messages_pass_through() {
        assert_eq!(classify_credential_error("connection reset"), None);
        assert_eq!(describe_credential_error("connection reset"), "connection reset");
        assert_eq!(
            describe_credential_error("ExpiredToken"),
            "Credentials have expired - Please refresh your credentials"
        );
    }
}
