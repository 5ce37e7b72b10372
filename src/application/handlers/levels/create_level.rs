//! CreateLevelHandler - Administrative level creation.

use std::sync::Arc;

use crate::application::retry::with_retry;
use crate::domain::foundation::LevelId;
use crate::domain::membership::{MembershipError, MembershipLevel};
use crate::ports::LevelRepository;

/// Command to add a level to the registry.
#[derive(Debug, Clone)]
pub struct CreateLevelCommand {
    pub name: String,
    pub sort_order: i32,
    pub price_cents: i64,
    pub duration_days: i64,
}

/// Handler creating membership levels.
pub struct CreateLevelHandler {
    levels: Arc<dyn LevelRepository>,
}

impl CreateLevelHandler {
    pub fn new(levels: Arc<dyn LevelRepository>) -> Self {
        Self { levels }
    }

    pub async fn handle(
        &self,
        cmd: CreateLevelCommand,
    ) -> Result<MembershipLevel, MembershipError> {
        let level = MembershipLevel::create(
            LevelId::new(),
            cmd.name,
            cmd.sort_order,
            cmd.price_cents,
            cmd.duration_days,
        )
        .map_err(|e| MembershipError::validation("level", e.to_string()))?;

        with_retry(|| self.levels.save(&level)).await?;
        Ok(level)
    }
}
