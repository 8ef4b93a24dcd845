//! Souk benchmarking suite
//!
//! Benchmarks for request fingerprinting, response cache lookups and
//! in-flight deduplication.

pub mod common;

pub use common::*;
