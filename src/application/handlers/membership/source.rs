//! Shared source-membership resolution.
//!
//! The quote and commit handlers must agree on which membership an
//! upgrade starts from; both call this one routine so their answers
//! cannot drift apart.

use crate::application::retry::with_retry;
use crate::domain::foundation::{MembershipId, Timestamp, UserId};
use crate::domain::membership::{
    select_current, Membership, MembershipError, MembershipLevel,
};
use crate::ports::{LevelRepository, MembershipRepository};

/// Resolves the membership an upgrade is priced against.
///
/// With an explicit `membership_id` the row must exist and belong to the
/// caller; a row that is no longer valid resolves to `None` (the quote
/// then carries no credit). Without one, the user's current membership
/// is selected: latest end date among valid rows, ties to the higher
/// level `sort_order`.
pub(super) async fn resolve_source_membership(
    memberships: &dyn MembershipRepository,
    levels: &dyn LevelRepository,
    user_id: &UserId,
    membership_id: Option<&MembershipId>,
    now: &Timestamp,
) -> Result<Option<(Membership, MembershipLevel)>, MembershipError> {
    if let Some(id) = membership_id {
        let membership = with_retry(|| memberships.find_by_id(id))
            .await?
            .ok_or_else(|| MembershipError::membership_not_found(*id))?;

        if &membership.user_id != user_id {
            return Err(MembershipError::forbidden(*id));
        }
        if !membership.is_valid_at(now) {
            return Ok(None);
        }

        let level = load_level(levels, &membership).await?;
        return Ok(Some((membership, level)));
    }

    let rows = with_retry(|| memberships.find_valid_for_user(user_id, now)).await?;
    let mut candidates = Vec::with_capacity(rows.len());
    for membership in rows {
        let level = load_level(levels, &membership).await?;
        candidates.push((membership, level));
    }

    Ok(select_current(&candidates, now).cloned())
}

/// A valid membership pointing at a missing level is corrupt data, not
/// a user error.
async fn load_level(
    levels: &dyn LevelRepository,
    membership: &Membership,
) -> Result<MembershipLevel, MembershipError> {
    with_retry(|| levels.find_by_id(&membership.level_id))
        .await?
        .ok_or_else(|| {
            MembershipError::infrastructure(format!(
                "Membership {} references missing level {}",
                membership.id, membership.level_id
            ))
        })
}
