//! Level registry handlers.

mod create_level;
mod list_levels;
mod retire_level;

pub use create_level::{CreateLevelCommand, CreateLevelHandler};
pub use list_levels::{ListLevelsHandler, ListLevelsQuery};
pub use retire_level::{RetireLevelCommand, RetireLevelHandler};
