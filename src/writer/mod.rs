//! Writers turning in-memory state back into content documents.
pub mod map;
pub mod save;
