//! Accounting engine clients.
//!
//! The engine contract lives in `ledgergate-accounting`. This module provides
//! the in-process reference engine the binary and tests run against.

mod in_memory;

pub use in_memory::InMemoryEngine;
