//! Tiergate - Membership Level, Redemption & Points Core
//!
//! Implements ordered membership levels, prorated upgrade pricing,
//! exactly-once redemption-code consumption, and an append-only points
//! ledger behind a hexagonal port/adapter boundary.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
