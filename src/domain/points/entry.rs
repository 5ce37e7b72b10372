//! Point ledger entries.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PointEntryId, Timestamp, UserId, ValidationError};

/// Where a ledger entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointSource {
    /// Granted by redeeming a code.
    Redemption,

    /// Granted alongside a purchase.
    Purchase,

    /// Spent by the user.
    Spend,

    /// Manual administrative correction.
    Adjustment,
}

/// One immutable row in a user's point ledger.
///
/// # Invariants
///
/// - `delta` is never zero (a no-op entry is a bug, not a record)
/// - Rows are append-only; nothing mutates an entry after creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointLedgerEntry {
    /// Unique identifier for this entry.
    pub id: PointEntryId,

    /// User whose balance this entry affects.
    pub user_id: UserId,

    /// Signed point change; positive grants, negative consumes.
    pub delta: i64,

    /// Origin of the change.
    pub source: PointSource,

    /// When the entry was appended.
    pub created_at: Timestamp,
}

impl PointLedgerEntry {
    /// Creates a grant entry (`delta > 0`).
    pub fn grant(
        id: PointEntryId,
        user_id: UserId,
        amount: i64,
        source: PointSource,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        if amount <= 0 {
            return Err(ValidationError::out_of_range("amount", 1, i64::MAX, amount));
        }
        Ok(Self {
            id,
            user_id,
            delta: amount,
            source,
            created_at: now,
        })
    }

    /// Creates a consumption entry (`delta < 0`).
    ///
    /// Whether the user can afford it is the ledger's job to check
    /// atomically at append time, not this constructor's.
    pub fn consume(
        id: PointEntryId,
        user_id: UserId,
        amount: i64,
        source: PointSource,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        if amount <= 0 {
            return Err(ValidationError::out_of_range("amount", 1, i64::MAX, amount));
        }
        Ok(Self {
            id,
            user_id,
            delta: -amount,
            source,
            created_at: now,
        })
    }
}

/// Balance as the sum of entry deltas.
pub fn balance_of(entries: &[PointLedgerEntry]) -> i64 {
    entries.iter().map(|e| e.delta).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    #[test]
    fn grant_produces_positive_delta() {
        let entry = PointLedgerEntry::grant(
            PointEntryId::new(),
            user(),
            50,
            PointSource::Redemption,
            Timestamp::now(),
        )
        .unwrap();
        assert_eq!(entry.delta, 50);
    }

    #[test]
    fn consume_produces_negative_delta() {
        let entry = PointLedgerEntry::consume(
            PointEntryId::new(),
            user(),
            30,
            PointSource::Spend,
            Timestamp::now(),
        )
        .unwrap();
        assert_eq!(entry.delta, -30);
    }

    #[test]
    fn zero_and_negative_amounts_are_rejected() {
        for amount in [0, -5] {
            assert!(PointLedgerEntry::grant(
                PointEntryId::new(),
                user(),
                amount,
                PointSource::Adjustment,
                Timestamp::now(),
            )
            .is_err());
            assert!(PointLedgerEntry::consume(
                PointEntryId::new(),
                user(),
                amount,
                PointSource::Spend,
                Timestamp::now(),
            )
            .is_err());
        }
    }

    #[test]
    fn balance_sums_deltas() {
        let now = Timestamp::now();
        let entries = vec![
            PointLedgerEntry::grant(PointEntryId::new(), user(), 100, PointSource::Purchase, now)
                .unwrap(),
            PointLedgerEntry::consume(PointEntryId::new(), user(), 40, PointSource::Spend, now)
                .unwrap(),
            PointLedgerEntry::grant(PointEntryId::new(), user(), 5, PointSource::Adjustment, now)
                .unwrap(),
        ];
        assert_eq!(balance_of(&entries), 65);
    }

    proptest! {
        #[test]
        fn balance_is_prefix_sum_of_deltas(amounts in prop::collection::vec(1i64..10_000, 0..50)) {
            let now = Timestamp::now();
            let entries: Vec<PointLedgerEntry> = amounts
                .iter()
                .enumerate()
                .map(|(i, &amount)| {
                    if i % 3 == 2 {
                        PointLedgerEntry::consume(
                            PointEntryId::new(), user(), amount, PointSource::Spend, now,
                        )
                        .unwrap()
                    } else {
                        PointLedgerEntry::grant(
                            PointEntryId::new(), user(), amount, PointSource::Purchase, now,
                        )
                        .unwrap()
                    }
                })
                .collect();

            let mut running = 0i64;
            for (i, entry) in entries.iter().enumerate() {
                running += entry.delta;
                prop_assert_eq!(balance_of(&entries[..=i]), running);
            }
        }
    }
}
