//! Command and query handlers, grouped by domain area.

pub mod levels;
pub mod membership;
pub mod points;
pub mod redemption;
