//! Common test utilities for API integration tests.

pub mod harness;

pub use harness::*;
