//! Membership handlers: resolution, upgrade quoting, upgrade commit.

mod calculate_upgrade_price;
mod commit_upgrade;
mod resolve_current_membership;
mod source;

pub use calculate_upgrade_price::{CalculateUpgradePriceCommand, CalculateUpgradePriceHandler};
pub use commit_upgrade::{CommitUpgradeCommand, CommitUpgradeHandler, CommitUpgradeResult};
pub use resolve_current_membership::{
    CurrentMembership, ResolveCurrentMembershipHandler, ResolveCurrentMembershipQuery,
};
