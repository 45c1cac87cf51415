//! Shared test utilities for autodocs integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs with temp directories and an in-memory store
//! - Builders for settings and archive fixtures

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
