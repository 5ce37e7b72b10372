//! Foundation module - Shared domain primitives.
//!
//! Contains the identifiers, value objects, error types, and event
//! infrastructure that form the vocabulary of the membership domain.

mod errors;
mod events;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{
    DomainEvent, EventEnvelope, EventId, EventMetadata, SerializableDomainEvent,
};
pub use ids::{
    LevelId, MembershipId, PointEntryId, RedemptionCodeId, UpgradeRecordId, UserId,
};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
