//! Redemption-specific error types.
//!
//! The two conflict variants are deliberately separate: a user retrying
//! a code they already burned needs a different message than a user
//! holding a code an administrator withdrew.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound | 404 |
//! | AlreadyUsed | 409 |
//! | Invalidated | 409 |
//! | EffectUnavailable | 422 |
//! | ValidationFailed | 400 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};

use super::CodeKey;

/// Redemption-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedemptionError {
    /// No code with this key exists.
    NotFound(String),

    /// The code was already consumed (terminal).
    AlreadyUsed {
        code: CodeKey,
        used_at: Option<Timestamp>,
    },

    /// The code was withdrawn by an administrator (terminal).
    Invalidated { code: CodeKey },

    /// The code exists and is unused, but its effect cannot be applied
    /// (e.g. its membership level has been retired).
    EffectUnavailable { code: CodeKey, reason: String },

    /// Validation failed.
    ValidationFailed { field: String, message: String },

    /// Infrastructure error.
    Infrastructure { message: String, retryable: bool },
}

impl RedemptionError {
    pub fn not_found(code: impl Into<String>) -> Self {
        RedemptionError::NotFound(code.into())
    }

    pub fn already_used(code: CodeKey, used_at: Option<Timestamp>) -> Self {
        RedemptionError::AlreadyUsed { code, used_at }
    }

    pub fn invalidated(code: CodeKey) -> Self {
        RedemptionError::Invalidated { code }
    }

    pub fn effect_unavailable(code: CodeKey, reason: impl Into<String>) -> Self {
        RedemptionError::EffectUnavailable {
            code,
            reason: reason.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        RedemptionError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        RedemptionError::Infrastructure {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            RedemptionError::NotFound(_) => ErrorCode::CodeNotFound,
            RedemptionError::AlreadyUsed { .. } => ErrorCode::CodeAlreadyUsed,
            RedemptionError::Invalidated { .. } => ErrorCode::CodeInvalidated,
            RedemptionError::EffectUnavailable { .. } => ErrorCode::LevelNotFound,
            RedemptionError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            RedemptionError::Infrastructure { retryable, .. } => {
                if *retryable {
                    ErrorCode::TransientStoreFailure
                } else {
                    ErrorCode::DatabaseError
                }
            }
        }
    }

    /// Returns true if this is a conflict on an already-terminal code.
    pub fn is_conflict(&self) -> bool {
        self.code().is_conflict()
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            RedemptionError::NotFound(code) => format!("Code '{}' does not exist", code),
            RedemptionError::AlreadyUsed { code, used_at } => match used_at {
                Some(at) => format!("Code '{}' was already redeemed at {}", code, at),
                None => format!("Code '{}' was already redeemed", code),
            },
            RedemptionError::Invalidated { code } => {
                format!("Code '{}' has been invalidated and can no longer be redeemed", code)
            }
            RedemptionError::EffectUnavailable { code, reason } => {
                format!("Code '{}' cannot be redeemed: {}", code, reason)
            }
            RedemptionError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            RedemptionError::Infrastructure { message, .. } => format!("Error: {}", message),
        }
    }
}

impl std::fmt::Display for RedemptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for RedemptionError {}

impl From<DomainError> for RedemptionError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::CodeNotFound => RedemptionError::NotFound(
                err.details
                    .get("code")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
            ),
            ErrorCode::ValidationFailed | ErrorCode::EmptyField | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => RedemptionError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            code => RedemptionError::Infrastructure {
                message: err.message,
                retryable: code.is_retryable(),
            },
        }
    }
}

impl From<RedemptionError> for DomainError {
    fn from(err: RedemptionError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
