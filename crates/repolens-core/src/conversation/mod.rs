//! Session-scoped conversation log.

pub mod store;
