//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//! Every port handle is passed explicitly per handler (`Arc<dyn Trait>`);
//! there is no process-wide store singleton.
//!
//! ## Store Ports
//!
//! - `LevelRepository` - Membership level registry
//! - `MembershipRepository` - User membership rows
//! - `RedemptionStore` - Codes plus the atomic consume-and-grant commit
//! - `PointLedger` - Append-only point entries with atomic balance check
//! - `UpgradeRecordStore` - Append-only upgrade audit rows
//!
//! ## Event Ports
//!
//! - `EventPublisher` - Fire-and-forget audit sink for domain events

mod event_publisher;
mod level_repository;
mod membership_repository;
mod point_ledger;
mod redemption_store;
mod upgrade_record_store;

pub use event_publisher::EventPublisher;
pub use level_repository::LevelRepository;
pub use membership_repository::MembershipRepository;
pub use point_ledger::PointLedger;
pub use redemption_store::{
    RedemptionCommit, RedemptionGrant, RedemptionReceipt, RedemptionStore,
};
pub use upgrade_record_store::UpgradeRecordStore;
