//! InvalidateCodeHandler - Administrative code withdrawal.
//!
//! `Unused -> Invalidated` through the same atomic check-and-transition
//! contract the redeem path uses; a code that loses the race to a
//! redeemer reports the already-used conflict.

use std::sync::Arc;

use crate::application::retry::with_retry;
use crate::domain::foundation::{
    ErrorCode, EventId, SerializableDomainEvent, Timestamp,
};
use crate::domain::redemption::{CodeInvalidated, CodeKey, RedemptionCode, RedemptionError};
use crate::ports::{EventPublisher, RedemptionStore};

/// Command to withdraw an unused code.
#[derive(Debug, Clone)]
pub struct InvalidateCodeCommand {
    pub code: String,
}

/// Handler invalidating redemption codes.
pub struct InvalidateCodeHandler {
    codes: Arc<dyn RedemptionStore>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl InvalidateCodeHandler {
    pub fn new(codes: Arc<dyn RedemptionStore>, event_publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            codes,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: InvalidateCodeCommand,
    ) -> Result<RedemptionCode, RedemptionError> {
        let key = CodeKey::try_new(&cmd.code)
            .map_err(|e| RedemptionError::validation("code", e.to_string()))?;
        let now = Timestamp::now();

        let code = match with_retry(|| self.codes.invalidate(&key, now)).await {
            Ok(code) => code,
            Err(err) if err.code == ErrorCode::CodeNotFound => {
                return Err(RedemptionError::not_found(key.as_str()));
            }
            Err(err) if err.code == ErrorCode::CodeAlreadyUsed => {
                return Err(RedemptionError::already_used(key, None));
            }
            Err(err) if err.code == ErrorCode::CodeInvalidated => {
                return Err(RedemptionError::invalidated(key));
            }
            Err(err) => return Err(err.into()),
        };

        let event = CodeInvalidated {
            event_id: EventId::new(),
            code_id: code.id,
            code: key.as_str().to_string(),
            occurred_at: now,
        };
        if let Err(err) = self.event_publisher.publish(event.to_envelope()).await {
            tracing::warn!(error = %err, "failed to publish redemption.code_invalidated event");
        }

        Ok(code)
    }
}
