//! Report generation modules.

pub mod generator;
pub mod keys;

pub use generator::*;
