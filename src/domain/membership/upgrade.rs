//! Prorated upgrade pricing.
//!
//! Converts the unused tail of a current membership into credit toward a
//! strictly higher level. Pure arithmetic; the commit step persists the
//! migration separately and must charge exactly the quoted price.
//!
//! Rounding policy: floor everywhere. Remaining time is floored to whole
//! days and the daily rate is integer division of the level price by its
//! duration. Credit is valued at the *source* level's rate (refund of
//! unused value, not a discount on the target).

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{LevelId, Timestamp, UpgradeRecordId, UserId};

use super::{Membership, MembershipError, MembershipLevel};

/// Result of an upgrade price calculation.
///
/// `final_price_cents` is never negative; `credit_applied_cents` never
/// exceeds the source level's full price nor the target's price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeQuote {
    /// Price to charge, in cents.
    pub final_price_cents: i64,

    /// Credit for unused source time, in cents.
    pub credit_applied_cents: i64,

    /// Whole days left on the source membership at quote time.
    pub remaining_days: i64,

    /// Level the user upgrades from, if any.
    pub source_level_id: Option<LevelId>,

    /// Level the user upgrades to.
    pub target_level_id: LevelId,
}

/// Append-only audit row recording one committed upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeRecord {
    pub id: UpgradeRecordId,
    pub user_id: UserId,
    pub from_level_id: Option<LevelId>,
    pub to_level_id: LevelId,
    pub price_charged_cents: i64,
    pub credit_applied_cents: i64,
    pub created_at: Timestamp,
}

impl UpgradeRecord {
    /// Builds the audit row for a quote the caller is committing.
    pub fn from_quote(user_id: UserId, quote: &UpgradeQuote, now: Timestamp) -> Self {
        Self {
            id: UpgradeRecordId::new(),
            user_id,
            from_level_id: quote.source_level_id,
            to_level_id: quote.target_level_id,
            price_charged_cents: quote.final_price_cents,
            credit_applied_cents: quote.credit_applied_cents,
            created_at: now,
        }
    }
}

/// Computes the prorated price of upgrading to `target`.
///
/// With no source membership the full target price applies. With one,
/// the target must sit strictly above the source level in `sort_order`
/// (no lateral moves, no downgrades dressed as upgrades).
///
/// Callers are responsible for having resolved `source` to a membership
/// that is valid at `now` and owned by the quoting user.
///
/// # Errors
///
/// `InvalidUpgrade` when the target is not strictly higher than the
/// source level.
pub fn quote_upgrade(
    source: Option<(&Membership, &MembershipLevel)>,
    target: &MembershipLevel,
    now: &Timestamp,
) -> Result<UpgradeQuote, MembershipError> {
    let Some((membership, source_level)) = source else {
        return Ok(UpgradeQuote {
            final_price_cents: target.price_cents,
            credit_applied_cents: 0,
            remaining_days: 0,
            source_level_id: None,
            target_level_id: target.id,
        });
    };

    if target.sort_order <= source_level.sort_order {
        return Err(MembershipError::invalid_upgrade(
            source_level.name.clone(),
            target.name.clone(),
        ));
    }

    let remaining_days = membership.remaining_days(now);
    let credit = (remaining_days * source_level.daily_rate_cents())
        .min(source_level.price_cents)
        .min(target.price_cents);
    let final_price = (target.price_cents - credit).max(0);

    Ok(UpgradeQuote {
        final_price_cents: final_price,
        credit_applied_cents: credit,
        remaining_days,
        source_level_id: Some(source_level.id),
        target_level_id: target.id,
    })
}
