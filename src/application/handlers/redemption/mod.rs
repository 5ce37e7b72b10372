//! Redemption code handlers: mint, redeem, invalidate.

mod create_code;
mod invalidate_code;
mod redeem_code;

pub use create_code::{CreateCodeCommand, CreateCodeHandler};
pub use invalidate_code::{InvalidateCodeCommand, InvalidateCodeHandler};
pub use redeem_code::{RedeemCodeCommand, RedeemCodeHandler, RedeemCodeResult};
