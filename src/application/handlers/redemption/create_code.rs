//! CreateCodeHandler - Administrative code minting.

use std::sync::Arc;

use crate::application::retry::with_retry;
use crate::domain::foundation::RedemptionCodeId;
use crate::domain::redemption::{CodeEffect, CodeKey, RedemptionCode, RedemptionError};
use crate::ports::{LevelRepository, RedemptionStore};

/// Command to mint a new single-use code.
#[derive(Debug, Clone)]
pub struct CreateCodeCommand {
    pub code: String,
    pub effect: CodeEffect,
}

/// Handler minting redemption codes.
pub struct CreateCodeHandler {
    codes: Arc<dyn RedemptionStore>,
    levels: Arc<dyn LevelRepository>,
}

impl CreateCodeHandler {
    pub fn new(codes: Arc<dyn RedemptionStore>, levels: Arc<dyn LevelRepository>) -> Self {
        Self { codes, levels }
    }

    pub async fn handle(&self, cmd: CreateCodeCommand) -> Result<RedemptionCode, RedemptionError> {
        let key = CodeKey::try_new(&cmd.code)
            .map_err(|e| RedemptionError::validation("code", e.to_string()))?;

        // Membership-day codes must point at a level that can still be
        // granted at mint time.
        if let CodeEffect::MembershipDays { level_id, .. } = cmd.effect {
            let level = with_retry(|| self.levels.find_by_id(&level_id))
                .await
                .map_err(RedemptionError::from)?;
            match level {
                Some(level) if level.is_active() => {}
                Some(level) => {
                    return Err(RedemptionError::validation(
                        "level_id",
                        format!("level {} is retired", level.name),
                    ));
                }
                None => {
                    return Err(RedemptionError::validation(
                        "level_id",
                        format!("level {} does not exist", level_id),
                    ));
                }
            }
        }

        let code = RedemptionCode::mint(RedemptionCodeId::new(), key, cmd.effect)
            .map_err(|e| RedemptionError::validation("effect", e.to_string()))?;

        with_retry(|| self.codes.save(&code))
            .await
            .map_err(RedemptionError::from)?;
        Ok(code)
    }
}
