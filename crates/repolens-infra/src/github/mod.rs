//! GitHub adapters: the reqwest transport and the JSON file backing the
//! repository-metadata cache.

pub mod cache_file;
pub mod transport;
