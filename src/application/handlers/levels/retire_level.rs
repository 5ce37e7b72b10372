//! RetireLevelHandler - Administrative soft delete.
//!
//! Retired levels stop appearing in the registry and stop being upgrade
//! targets; memberships that reference them keep working.

use std::sync::Arc;

use crate::application::retry::with_retry;
use crate::domain::foundation::LevelId;
use crate::domain::membership::{MembershipError, MembershipLevel};
use crate::ports::LevelRepository;

/// Command to retire a level.
#[derive(Debug, Clone)]
pub struct RetireLevelCommand {
    pub level_id: LevelId,
}

/// Handler retiring membership levels.
pub struct RetireLevelHandler {
    levels: Arc<dyn LevelRepository>,
}

impl RetireLevelHandler {
    pub fn new(levels: Arc<dyn LevelRepository>) -> Self {
        Self { levels }
    }

    pub async fn handle(
        &self,
        cmd: RetireLevelCommand,
    ) -> Result<MembershipLevel, MembershipError> {
        let mut level = with_retry(|| self.levels.find_by_id(&cmd.level_id))
            .await?
            .ok_or_else(|| MembershipError::level_not_found(cmd.level_id))?;

        level
            .retire()
            .map_err(|e| MembershipError::validation("status", e.to_string()))?;

        with_retry(|| self.levels.update(&level)).await?;
        Ok(level)
    }
}
