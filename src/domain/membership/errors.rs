//! Membership-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | LevelNotFound | 404 |
//! | MembershipNotFound | 404 |
//! | InvalidUpgrade | 400 |
//! | QuoteExpired | 409 |
//! | Forbidden | 403 |
//! | ValidationFailed | 400 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, LevelId, MembershipId};

/// Membership-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipError {
    /// Level does not exist or is retired.
    LevelNotFound(LevelId),

    /// Membership row was not found.
    MembershipNotFound(MembershipId),

    /// Target level is not strictly higher than the source level.
    InvalidUpgrade {
        from: String,
        to: String,
    },

    /// The committed price no longer matches a fresh quote.
    QuoteExpired {
        quoted_cents: i64,
        current_cents: i64,
    },

    /// Caller does not own the referenced membership.
    Forbidden(MembershipId),

    /// Validation failed.
    ValidationFailed {
        field: String,
        message: String,
    },

    /// Infrastructure error.
    Infrastructure {
        message: String,
        retryable: bool,
    },
}

impl MembershipError {
    pub fn level_not_found(id: LevelId) -> Self {
        MembershipError::LevelNotFound(id)
    }

    pub fn membership_not_found(id: MembershipId) -> Self {
        MembershipError::MembershipNotFound(id)
    }

    pub fn invalid_upgrade(from: impl Into<String>, to: impl Into<String>) -> Self {
        MembershipError::InvalidUpgrade {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn quote_expired(quoted_cents: i64, current_cents: i64) -> Self {
        MembershipError::QuoteExpired {
            quoted_cents,
            current_cents,
        }
    }

    pub fn forbidden(id: MembershipId) -> Self {
        MembershipError::Forbidden(id)
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        MembershipError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        MembershipError::Infrastructure {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            MembershipError::LevelNotFound(_) => ErrorCode::LevelNotFound,
            MembershipError::MembershipNotFound(_) => ErrorCode::MembershipNotFound,
            MembershipError::InvalidUpgrade { .. } => ErrorCode::InvalidUpgrade,
            MembershipError::QuoteExpired { .. } => ErrorCode::QuoteExpired,
            MembershipError::Forbidden(_) => ErrorCode::Forbidden,
            MembershipError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            MembershipError::Infrastructure { retryable, .. } => {
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
            MembershipError::LevelNotFound(id) => {
                format!("Membership level not found: {}", id)
            }
            MembershipError::MembershipNotFound(id) => {
                format!("Membership not found: {}", id)
            }
            MembershipError::InvalidUpgrade { from, to } => {
                format!("Cannot upgrade from {} to {}: target must be a strictly higher level", from, to)
            }
            MembershipError::QuoteExpired { quoted_cents, current_cents } => {
                format!(
                    "Quoted price {} no longer matches current price {}; request a new quote",
                    quoted_cents, current_cents
                )
            }
            MembershipError::Forbidden(id) => {
                format!("Membership {} belongs to another user", id)
            }
            MembershipError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            MembershipError::Infrastructure { message, .. } => format!("Error: {}", message),
        }
    }
}

impl std::fmt::Display for MembershipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for MembershipError {}

impl From<DomainError> for MembershipError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed | ErrorCode::EmptyField | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => MembershipError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            code => MembershipError::Infrastructure {
                message: err.message,
                retryable: code.is_retryable(),
            },
        }
    }
}

impl From<MembershipError> for DomainError {
    fn from(err: MembershipError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
