//! Core domain model for sift.
//!
//! This crate defines the dataset row model, the SQLite catalog that holds
//! imported rows, and the readers that turn CSV and JSON datasets into rows.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod dataset;
pub mod error;
pub mod model;
pub mod schema;

pub use dataset::{read_dataset, Columns, DatasetFormat};
pub use error::{Error, Result};
pub use model::{snapshot_fingerprint, Row, RowId, SnapshotHasher};
