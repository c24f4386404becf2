//! GitHub access for the model's tools.
//!
//! - `url`: the single GitHub URL pattern every tool shares
//! - `transport`: the HTTP port plus endpoint and credential handling
//! - `cache`: write-through cache for repository metadata
//! - `tools`: the four capabilities exposed to the model

pub mod cache;
pub mod tools;
pub mod transport;
pub mod url;
