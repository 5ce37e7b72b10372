//! Redemption code aggregate and value objects.
//!
//! # Validation Rules
//!
//! - Code keys are 4-32 characters of `[A-Z0-9-]` after trimming and
//!   uppercasing; lookups always go through the normalized form
//! - Membership-day effects must grant at least one day
//! - Point effects must grant at least one point

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    LevelId, RedemptionCodeId, StateMachine, Timestamp, UserId, ValidationError,
};

use super::{CodeStatus, RedemptionError};

/// A validated, normalized redemption code key.
///
/// This is the human-facing string a user types in. The aggregate also
/// carries a surrogate `RedemptionCodeId` for foreign keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeKey(String);

impl CodeKey {
    const MIN_LEN: usize = 4;
    const MAX_LEN: usize = 32;

    /// Creates a CodeKey from user input, trimming and uppercasing.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the trimmed code is empty, outside
    /// 4-32 characters, or contains anything but `[A-Z0-9-]`.
    pub fn try_new(code: &str) -> Result<Self, ValidationError> {
        let normalized = code.trim().to_uppercase();

        if normalized.is_empty() {
            return Err(ValidationError::empty_field("code"));
        }
        if normalized.len() < Self::MIN_LEN || normalized.len() > Self::MAX_LEN {
            return Err(ValidationError::out_of_range(
                "code_length",
                Self::MIN_LEN as i64,
                Self::MAX_LEN as i64,
                normalized.len() as i64,
            ));
        }
        if !normalized
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(ValidationError::invalid_format(
                "code",
                "uppercase letters, digits, and hyphens only",
            ));
        }

        Ok(Self(normalized))
    }

    /// Returns the normalized code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What redeeming a code grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CodeEffect {
    /// Grants membership time at a level: extends the user's current
    /// same-level membership or opens a new one.
    MembershipDays { level_id: LevelId, days: i64 },

    /// Grants points to the redeeming user's ledger.
    Points { amount: i64 },
}

impl CodeEffect {
    /// Validates the effect's magnitude.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            CodeEffect::MembershipDays { days, .. } if *days <= 0 => Err(
                ValidationError::out_of_range("days", 1, i64::MAX, *days),
            ),
            CodeEffect::Points { amount } if *amount <= 0 => Err(
                ValidationError::out_of_range("amount", 1, i64::MAX, *amount),
            ),
            _ => Ok(()),
        }
    }
}

/// Redemption code aggregate.
///
/// # Invariants
///
/// - `key` is globally unique (database constraint)
/// - `used_by`/`used_at` are set exactly when status is Used
/// - `invalidated_at` is set exactly when status is Invalidated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionCode {
    /// Surrogate identifier.
    pub id: RedemptionCodeId,

    /// Unique human-facing code string.
    pub key: CodeKey,

    /// What redeeming this code grants.
    pub effect: CodeEffect,

    /// Lifecycle status.
    pub status: CodeStatus,

    /// User who consumed the code, if used.
    pub used_by: Option<UserId>,

    /// When the code was consumed, if used.
    pub used_at: Option<Timestamp>,

    /// When an administrator withdrew the code, if invalidated.
    pub invalidated_at: Option<Timestamp>,

    /// When the code was minted.
    pub created_at: Timestamp,
}

impl RedemptionCode {
    /// Mints a fresh unused code.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the effect grants nothing.
    pub fn mint(
        id: RedemptionCodeId,
        key: CodeKey,
        effect: CodeEffect,
    ) -> Result<Self, ValidationError> {
        effect.validate()?;
        Ok(Self {
            id,
            key,
            effect,
            status: CodeStatus::Unused,
            used_by: None,
            used_at: None,
            invalidated_at: None,
            created_at: Timestamp::now(),
        })
    }

    /// Consumes the code for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns the conflict for this code's terminal state if it is no
    /// longer unused.
    pub fn mark_used(&mut self, user_id: UserId, now: Timestamp) -> Result<(), RedemptionError> {
        self.status = self
            .status
            .transition_to(CodeStatus::Used)
            .map_err(|_| self.conflict())?;
        self.used_by = Some(user_id);
        self.used_at = Some(now);
        Ok(())
    }

    /// Withdraws the code administratively.
    ///
    /// # Errors
    ///
    /// Returns the conflict for this code's terminal state if it is no
    /// longer unused.
    pub fn mark_invalidated(&mut self, now: Timestamp) -> Result<(), RedemptionError> {
        self.status = self
            .status
            .transition_to(CodeStatus::Invalidated)
            .map_err(|_| self.conflict())?;
        self.invalidated_at = Some(now);
        Ok(())
    }

    /// The conflict error matching this code's current terminal state.
    ///
    /// Distinguishes "already used" from "invalidated" so callers can
    /// tell the user which happened.
    pub fn conflict(&self) -> RedemptionError {
        match self.status {
            CodeStatus::Used => RedemptionError::already_used(self.key.clone(), self.used_at),
            CodeStatus::Invalidated => RedemptionError::invalidated(self.key.clone()),
            // An Unused code has no conflict; treat as an internal misuse.
            CodeStatus::Unused => RedemptionError::infrastructure(format!(
                "conflict() called on unused code {}",
                self.key
            )),
        }
    }
}
