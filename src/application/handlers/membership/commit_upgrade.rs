//! CommitUpgradeHandler - Applies a quoted upgrade.
//!
//! Recomputes the quote and refuses to proceed if the price drifted from
//! what the caller saw (`QuoteExpired`); the charge is always the quoted
//! number. Payment capture is external; this handler records the
//! migration: close the old row, open the new one, append the audit row.

use std::sync::Arc;

use crate::application::retry::with_retry;
use crate::domain::foundation::{
    EventId, LevelId, MembershipId, SerializableDomainEvent, Timestamp, UserId,
};
use crate::domain::membership::{
    quote_upgrade, Membership, MembershipError, MembershipSource, MembershipUpgraded,
    UpgradeRecord,
};
use crate::ports::{
    EventPublisher, LevelRepository, MembershipRepository, UpgradeRecordStore,
};

use super::source::resolve_source_membership;

/// Command to commit a previously quoted upgrade.
#[derive(Debug, Clone)]
pub struct CommitUpgradeCommand {
    pub user_id: UserId,
    pub target_level_id: LevelId,
    pub membership_id: Option<MembershipId>,
    /// The price the caller was quoted and has agreed to pay.
    pub quoted_price_cents: i64,
}

/// Result of a committed upgrade.
#[derive(Debug, Clone)]
pub struct CommitUpgradeResult {
    /// The freshly opened membership at the target level.
    pub membership: Membership,
    /// The appended audit row.
    pub record: UpgradeRecord,
}

/// Handler migrating a membership to a higher level at the quoted price.
pub struct CommitUpgradeHandler {
    memberships: Arc<dyn MembershipRepository>,
    levels: Arc<dyn LevelRepository>,
    upgrade_records: Arc<dyn UpgradeRecordStore>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl CommitUpgradeHandler {
    pub fn new(
        memberships: Arc<dyn MembershipRepository>,
        levels: Arc<dyn LevelRepository>,
        upgrade_records: Arc<dyn UpgradeRecordStore>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            memberships,
            levels,
            upgrade_records,
            event_publisher,
        }
    }

    pub async fn handle(
        &self,
        cmd: CommitUpgradeCommand,
    ) -> Result<CommitUpgradeResult, MembershipError> {
        let now = Timestamp::now();

        // 1. Recompute the quote with the same inputs the calculator uses.
        let target = with_retry(|| self.levels.find_by_id(&cmd.target_level_id))
            .await?
            .filter(|level| level.is_active())
            .ok_or_else(|| MembershipError::level_not_found(cmd.target_level_id))?;

        let source = resolve_source_membership(
            self.memberships.as_ref(),
            self.levels.as_ref(),
            &cmd.user_id,
            cmd.membership_id.as_ref(),
            &now,
        )
        .await?;

        let quote = quote_upgrade(source.as_ref().map(|(m, l)| (m, l)), &target, &now)?;

        // 2. No drift between quote and charge.
        if quote.final_price_cents != cmd.quoted_price_cents {
            return Err(MembershipError::quote_expired(
                cmd.quoted_price_cents,
                quote.final_price_cents,
            ));
        }

        // 3. Close the source row; its unused tail became the credit.
        if let Some((mut membership, _)) = source {
            membership.cancel(now)?;
            with_retry(|| self.memberships.update(&membership)).await?;
        }

        // 4. Open the target-level membership for its full duration.
        let membership = Membership::start(
            MembershipId::new(),
            cmd.user_id.clone(),
            target.id,
            now,
            target.duration_days,
            MembershipSource::Upgrade,
        );
        with_retry(|| self.memberships.save(&membership)).await?;

        // 5. Append the audit row.
        let record = UpgradeRecord::from_quote(cmd.user_id.clone(), &quote, now);
        with_retry(|| self.upgrade_records.append(&record)).await?;

        // 6. Audit event; the sink is fire-and-forget.
        let event = MembershipUpgraded {
            event_id: EventId::new(),
            membership_id: membership.id,
            user_id: cmd.user_id.clone(),
            from_level_id: quote.source_level_id,
            to_level_id: quote.target_level_id,
            price_charged_cents: quote.final_price_cents,
            credit_applied_cents: quote.credit_applied_cents,
            occurred_at: now,
        };
        let envelope = event.to_envelope().with_user_id(cmd.user_id.to_string());
        if let Err(err) = self.event_publisher.publish(envelope).await {
            tracing::warn!(error = %err, "failed to publish membership.upgraded event");
        }

        Ok(CommitUpgradeResult { membership, record })
    }
}
