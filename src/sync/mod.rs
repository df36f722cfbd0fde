//! Team list synchronization.
//!
//! Reconciliation of stored and incoming team lists, and the spreadsheet
//! payload format used to share them.

pub mod merge;
pub mod sheets;

pub use merge::{reconcile, resolve_selection, ImportSummary, MergePolicy};
