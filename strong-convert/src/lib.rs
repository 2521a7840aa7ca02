//! strong-convert - normalizes a strong workout export into SQLite
//!
//! The export carries one row per set, with workout- and exercise-level
//! fields repeated on every row. Conversion rebuilds the
//! workout → exercise → set hierarchy and persists it relationally:
//!
//! - [`record`]: typed parsing of one raw row
//! - [`ids`]: surface identifiers and the per-run exercise registry
//! - [`grouping`]: workout / exercise partitioning
//! - [`hierarchy`]: entity construction
//! - [`store`]: transactional persistence
//! - [`convert`]: the end-to-end pipeline

pub mod convert;
pub mod grouping;
pub mod hierarchy;
pub mod ids;
pub mod reader;
pub mod record;
pub mod store;

pub use convert::{normalize, run, ConversionSummary, Normalized};
