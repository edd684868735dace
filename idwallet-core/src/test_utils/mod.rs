//! Test utilities for the wallet
//!
//! Test doubles for every collaborator of the session coordinator, data
//! fixtures, and async helpers. Available to integration tests through the
//! `test-utils` feature.

pub mod async_helpers;
pub mod fixtures;
pub mod mocks;
pub mod wallet;

pub use async_helpers::*;
pub use mocks::*;
pub use wallet::{test_config, TestWallet};
