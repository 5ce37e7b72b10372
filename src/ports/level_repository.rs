//! Level repository port.
//!
//! The registry of membership levels. Levels are soft-deleted via
//! `update` flipping their status; nothing ever removes a row that a
//! membership may still reference.

use crate::domain::foundation::{DomainError, LevelId};
use crate::domain::membership::MembershipLevel;
use async_trait::async_trait;

/// Repository port for the membership level registry.
#[async_trait]
pub trait LevelRepository: Send + Sync {
    /// Persist a newly created level.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if a level with the same sort_order exists
    /// - `DatabaseError` on persistence failure
    async fn save(&self, level: &MembershipLevel) -> Result<(), DomainError>;

    /// Persist changes to an existing level (retirement).
    ///
    /// # Errors
    ///
    /// - `LevelNotFound` if the level doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, level: &MembershipLevel) -> Result<(), DomainError>;

    /// Find a level by its ID, retired or not.
    ///
    /// Returns `None` if not found. Retired levels are returned so that
    /// existing memberships keep resolving.
    async fn find_by_id(&self, id: &LevelId) -> Result<Option<MembershipLevel>, DomainError>;

    /// All active levels ordered by ascending `sort_order`.
    async fn list_active(&self) -> Result<Vec<MembershipLevel>, DomainError>;
}
