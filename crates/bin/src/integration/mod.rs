//! Provider wiring for the command-line runs.
//!
//! Wraps the Yahoo and FRED clients in cache-aware sources the pipeline can
//! consume.

pub(crate) mod cache_manager;
pub(crate) mod data_pipeline;
