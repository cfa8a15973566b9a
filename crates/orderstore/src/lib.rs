//! # orderstore
//!
//! Embedded append-only record store used as the durable backing store of
//! the order cache.
//!
//! ## Properties
//! - Records are `key -> bytes`, keys are unique and never overwritten
//! - Single data file, index rebuilt on open from a memory map
//! - Basic operations: GET, PUT, CONTAINS, SCAN
//! - 1 MB max value, 1 GB max DB size

#![warn(missing_docs)]

mod error;
mod parser;
mod storage;

pub use error::{Error, Result};
pub use storage::{OrderStore, DATA_FILE};
