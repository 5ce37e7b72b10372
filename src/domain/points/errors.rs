//! Points-specific error types.

use crate::domain::foundation::{DomainError, ErrorCode, UserId};

/// Points-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointsError {
    /// The consume would push the user's balance below zero.
    InsufficientBalance {
        user_id: UserId,
        requested: i64,
        available: i64,
    },

    /// Validation failed.
    ValidationFailed { field: String, message: String },

    /// Infrastructure error.
    Infrastructure { message: String, retryable: bool },
}

impl PointsError {
    pub fn insufficient_balance(user_id: UserId, requested: i64, available: i64) -> Self {
        PointsError::InsufficientBalance {
            user_id,
            requested,
            available,
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PointsError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        PointsError::Infrastructure {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            PointsError::InsufficientBalance { .. } => ErrorCode::InsufficientBalance,
            PointsError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            PointsError::Infrastructure { retryable, .. } => {
                if *retryable {
                    ErrorCode::TransientStoreFailure
                } else {
                    ErrorCode::DatabaseError
                }
            }
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            PointsError::InsufficientBalance {
                requested,
                available,
                ..
            } => format!(
                "Insufficient points: requested {}, available {}",
                requested, available
            ),
            PointsError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            PointsError::Infrastructure { message, .. } => format!("Error: {}", message),
        }
    }
}

impl std::fmt::Display for PointsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for PointsError {}

impl From<DomainError> for PointsError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::InsufficientBalance => {
                // Adapter-level conflicts carry amounts in details when known.
                let get = |key: &str| {
                    err.details
                        .get(key)
                        .and_then(|v| v.parse::<i64>().ok())
                        .unwrap_or(0)
                };
                match err.details.get("user_id").map(|s| UserId::new(s.clone())) {
                    Some(Ok(user_id)) => PointsError::InsufficientBalance {
                        user_id,
                        requested: get("requested"),
                        available: get("available"),
                    },
                    _ => PointsError::Infrastructure {
                        message: err.message,
                        retryable: false,
                    },
                }
            }
            ErrorCode::ValidationFailed | ErrorCode::EmptyField | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => PointsError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            code => PointsError::Infrastructure {
                message: err.message,
                retryable: code.is_retryable(),
            },
        }
    }
}

impl From<PointsError> for DomainError {
    fn from(err: PointsError) -> Self {
        let domain = DomainError::new(err.code(), err.message());
        match &err {
            PointsError::InsufficientBalance {
                user_id,
                requested,
                available,
            } => domain
                .with_detail("user_id", user_id.as_str())
                .with_detail("requested", requested.to_string())
                .with_detail("available", available.to_string()),
            _ => domain,
        }
    }
}
