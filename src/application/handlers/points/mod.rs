//! Points ledger handlers.

mod consume_points;
mod get_balance;
mod grant_points;

pub use consume_points::{ConsumePointsCommand, ConsumePointsHandler};
pub use get_balance::{GetPointsBalanceHandler, GetPointsBalanceQuery};
pub use grant_points::{GrantPointsCommand, GrantPointsHandler};
