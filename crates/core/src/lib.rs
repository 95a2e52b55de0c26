//! `ledgergate-core` — identifier and value primitives shared by the gateway.
//!
//! This crate contains **pure** conversions (no IO): external ids to engine keys,
//! display-name packing, time windows and display formatting.

pub mod error;
pub mod id;
pub mod name;
pub mod time;

pub use error::{DomainError, DomainResult};
pub use id::{AccountId, EngineKey, TransferId, to_engine_key, to_external_id};
pub use name::{DisplayName, NAME_CAPACITY};
pub use time::{DisplayClock, TimeWindow, now_micros};
