//! Test Helper Utilities
//!
//! Shared utilities for testing capsule-api

#![allow(dead_code)]

pub mod fake_b2;

pub use fake_b2::{spawn_fake_b2, test_config, FakeB2, TEST_BUCKET_NAME, TEST_KEY_ID};
