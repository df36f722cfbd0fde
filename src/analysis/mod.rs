//! Inventory analysis.
//!
//! Aggregation of agent inventories and presentation-level classification
//! of the aggregated item codes.

pub mod aggregator;
pub mod catalog;

pub use aggregator::*;
