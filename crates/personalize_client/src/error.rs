//! Error types for calls to the service and its prerequisites.

use core::error::Error;
use core::fmt::Debug;

use aws_sdk_personalize::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use thiserror::Error;

/// Errors from remote API calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// A resource with the requested name already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Throttled - rate limited
    #[error("Throttled: {0}")]
    Throttled(String),

    /// Account quota reached
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    /// Request rejected as invalid
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Any other service-side error
    #[error("{code}: {message}")]
    Service { code: String, message: String },

    /// The request never produced a service response
    #[error("Transport error: {0}")]
    Transport(String),

    /// A response lacked a field the caller needs
    #[error("Response missing field `{0}`")]
    MissingField(&'static str),
}

impl ApiError {
    /// Classifies a service error code.
    #[must_use]
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "ResourceAlreadyExistsException" | "EntityAlreadyExists" | "BucketAlreadyOwnedByYou" => {
                Self::AlreadyExists(message)
            }
            "ResourceNotFoundException" | "NoSuchEntity" | "NoSuchBucket" | "NotFound" => {
                Self::NotFound(message)
            }
            "ThrottlingException" | "Throttling" | "TooManyRequestsException" | "SlowDown" => {
                Self::Throttled(message)
            }
            "LimitExceededException" => Self::LimitExceeded(message),
            "InvalidInputException" | "InvalidParameterValueException" | "MalformedPolicyDocument" => {
                Self::InvalidInput(message)
            }
            _ => Self::Service {
                code: code.to_string(),
                message,
            },
        }
    }

    /// Only throttling is retried; everything else goes back to the caller.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled(_))
    }
}

/// Result type for remote API calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Converts an SDK error from any of the AWS clients into an [`ApiError`].
pub fn classify<E, R>(error: SdkError<E, R>) -> ApiError
where
    E: ProvideErrorMetadata + Error + 'static,
    R: Debug,
{
    match error.code() {
        Some(code) => {
            let message = error
                .message()
                .map_or_else(|| code.to_string(), ToString::to_string);
            ApiError::from_code(code, message)
        }
        None => ApiError::Transport(DisplayErrorContext(&error).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert_eq!(
            ApiError::from_code("ResourceAlreadyExistsException", "dup"),
            ApiError::AlreadyExists("dup".to_string())
        );
        assert_eq!(
            ApiError::from_code("EntityAlreadyExists", "role"),
            ApiError::AlreadyExists("role".to_string())
        );
        assert_eq!(
            ApiError::from_code("NoSuchEntity", "role"),
            ApiError::NotFound("role".to_string())
        );
        assert!(ApiError::from_code("ThrottlingException", "slow down").is_retryable());
        assert_eq!(
            ApiError::from_code("ResourceInUseException", "busy"),
            ApiError::Service {
                code: "ResourceInUseException".to_string(),
                message: "busy".to_string()
            }
        );
    }

    #[test]
    fn test_only_throttling_retries() {
        assert!(!ApiError::LimitExceeded("quota".to_string()).is_retryable());
        assert!(!ApiError::AlreadyExists("dup".to_string()).is_retryable());
        assert!(!ApiError::Transport("reset".to_string()).is_retryable());
    }
}
