//! Data-driven unit definitions.
//!
//! Pure data structures deserialized from RON. This module performs no
//! IO: callers read files and hand the text over.

mod catalog;
mod unit_data;

pub use catalog::UnitCatalog;
pub use unit_data::UnitData;
