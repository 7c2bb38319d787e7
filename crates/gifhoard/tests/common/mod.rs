//! Shared test utilities for gifhoard integration tests.
//!
//! This module provides:
//! - `TestHarness` with an on-disk store and scripted collaborators
//! - Builders for listing pages and items

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{FakeFetcher, FakeTranscoder, TestHarness};
