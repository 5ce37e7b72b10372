//! Redemption code domain module.
//!
//! One-time-use codes that grant membership days or points. A code moves
//! `Unused -> Used` exactly once, or `Unused -> Invalidated` by an
//! administrator; both targets are terminal.

mod code;
mod errors;
mod events;
mod status;

pub use code::{CodeEffect, CodeKey, RedemptionCode};
pub use errors::RedemptionError;
pub use events::{CodeInvalidated, CodeRedeemed};
pub use status::CodeStatus;
