//! Wire and data model shared by the watch-party client crates.

pub mod model;

pub use model::*;
