//! Database models for persistent storage.

mod row;
mod table;

pub use row::*;
pub use table::*;
