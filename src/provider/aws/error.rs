//! SCIM client errors.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by [`super::AwsScimClient`]
///
/// The field constraint variants mirror the limits the AWS SSO SCIM endpoint
/// enforces, so a bad request fails locally instead of after a round trip.
#[derive(Debug, Error)]
pub enum ScimError {
    #[error("aws: url may not be empty")]
    UrlEmpty,

    #[error("aws: error parsing url {url:?}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("aws: display name may not be empty")]
    DisplayNameEmpty,

    #[error("aws: given name may not be empty")]
    GivenNameEmpty,

    #[error("aws: family name may not be empty")]
    FamilyNameEmpty,

    #[error("aws: emails may not be more than 1")]
    EmailsTooMany,

    #[error("aws: group id may not be empty")]
    GroupIdEmpty,

    #[error("aws: user id may not be empty")]
    UserIdEmpty,

    #[error("aws: patch request may not be empty")]
    PatchEmpty,

    #[error("aws: api error, status {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("aws: error sending request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("aws: error decoding response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ScimError {
    /// Throttling, server side and transport failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            ScimError::Api { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || *status >= 500
            }
            ScimError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ScimError::Api { status, .. } if *status == StatusCode::NOT_FOUND.as_u16())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ScimError::Api { status, .. } if *status == StatusCode::CONFLICT.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> ScimError {
        ScimError::Api {
            status,
            detail: "detail".to_string(),
        }
    }

    #[test]
    fn test_throttling_and_server_errors_are_retryable() {
        assert!(api(429).is_retryable());
        assert!(api(500).is_retryable());
        assert!(api(503).is_retryable());
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        assert!(!api(400).is_retryable());
        assert!(!api(404).is_retryable());
        assert!(!api(409).is_retryable());
        assert!(!ScimError::DisplayNameEmpty.is_retryable());
    }

    #[test]
    fn test_status_helpers() {
        assert!(api(404).is_not_found());
        assert!(!api(404).is_conflict());
        assert!(api(409).is_conflict());
        assert!(!api(500).is_not_found());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(ScimError::UrlEmpty.to_string(), "aws: url may not be empty");
        assert_eq!(
            api(400).to_string(),
            "aws: api error, status 400: detail"
        );
    }
}
