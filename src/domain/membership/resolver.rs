//! Current-membership selection.
//!
//! A user may have many membership rows; the current one is the valid row
//! with the latest end date, ties broken by the more privileged level.

use crate::domain::foundation::Timestamp;

use super::{Membership, MembershipLevel};

/// Selects the user's current membership among candidate rows.
///
/// A candidate counts only if it is valid at `now` (Active with an end
/// date in the future). Among valid rows the winner has the latest
/// `ends_at`; exact ties go to the level with the higher `sort_order`.
///
/// Read-only; callers pass rows joined with their levels.
pub fn select_current<'a>(
    candidates: &'a [(Membership, MembershipLevel)],
    now: &Timestamp,
) -> Option<&'a (Membership, MembershipLevel)> {
    candidates
        .iter()
        .filter(|(membership, _)| membership.is_valid_at(now))
        .max_by_key(|(membership, level)| (membership.ends_at, level.sort_order))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{LevelId, MembershipId, UserId};
    use crate::domain::membership::MembershipSource;

    fn level(sort_order: i32) -> MembershipLevel {
        MembershipLevel::create(LevelId::new(), format!("L{}", sort_order), sort_order, 10_000, 30)
            .unwrap()
    }

    fn membership_at(level: &MembershipLevel, duration_days: i64) -> Membership {
        Membership::start(
            MembershipId::new(),
            UserId::new("user-1").unwrap(),
            level.id,
            Timestamp::now(),
            duration_days,
            MembershipSource::Purchase,
        )
    }

    #[test]
    fn returns_none_without_valid_rows() {
        let now = Timestamp::now();
        assert!(select_current(&[], &now).is_none());

        let l = level(1);
        let mut expired = membership_at(&l, 30);
        expired.expire().unwrap();
        assert!(select_current(&[(expired, l)], &now).is_none());
    }

    #[test]
    fn picks_latest_end_date() {
        let now = Timestamp::now();
        let l1 = level(1);
        let l2 = level(2);
        let short = membership_at(&l1, 10);
        let long = membership_at(&l2, 40);
        let long_id = long.id;

        let rows = vec![(short, l1), (long, l2)];
        let current = select_current(&rows, &now).unwrap();
        assert_eq!(current.0.id, long_id);
    }

    #[test]
    fn tie_goes_to_higher_sort_order() {
        let now = Timestamp::now();
        let low = level(1);
        let high = level(9);
        let starts = Timestamp::now();

        let mut a = membership_at(&low, 30);
        let mut b = membership_at(&high, 30);
        // Force an exact end-date tie
        a.starts_at = starts;
        a.ends_at = starts.add_days(30);
        b.starts_at = starts;
        b.ends_at = starts.add_days(30);
        let b_id = b.id;

        let rows = vec![(a, low), (b, high)];
        let current = select_current(&rows, &now).unwrap();
        assert_eq!(current.0.id, b_id);
    }

    #[test]
    fn skips_invalid_rows_even_with_later_end() {
        let now = Timestamp::now();
        let l1 = level(1);
        let l2 = level(2);
        let valid = membership_at(&l1, 10);
        let valid_id = valid.id;
        let mut cancelled = membership_at(&l2, 90);
        cancelled.cancel(Timestamp::now()).unwrap();

        let rows = vec![(valid, l1), (cancelled, l2)];
        let current = select_current(&rows, &now).unwrap();
        assert_eq!(current.0.id, valid_id);
    }
}
