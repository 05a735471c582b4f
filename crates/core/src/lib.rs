//! Core domain for the stockroom inventory record-keeper: the record model
//! and its pure mutation operations, the tabular import/export codec, and the
//! client-side synchronization engine (save scheduler + sync coordinator).

pub mod codec;
pub mod errors;
pub mod inventory;
pub mod sync;
