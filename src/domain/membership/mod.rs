//! Membership domain module.
//!
//! Ordered membership levels, the user-membership lifecycle, current
//! membership resolution, and prorated upgrade pricing.
//!
//! # Module Structure
//!
//! - `level` - MembershipLevel entity and LevelStatus soft-delete machine
//! - `aggregate` - Membership aggregate entity
//! - `status` - MembershipStatus state machine
//! - `resolver` - Current-membership selection rule
//! - `upgrade` - Proration arithmetic and UpgradeQuote
//! - `errors` - MembershipError
//! - `events` - Domain events

mod aggregate;
mod errors;
mod events;
mod level;
mod resolver;
mod status;
mod upgrade;

pub use aggregate::{Membership, MembershipSource};
pub use errors::MembershipError;
pub use events::{MembershipCreated, MembershipExtended, MembershipUpgraded};
pub use level::{LevelStatus, MembershipLevel};
pub use resolver::select_current;
pub use status::MembershipStatus;
pub use upgrade::{quote_upgrade, UpgradeQuote, UpgradeRecord};
