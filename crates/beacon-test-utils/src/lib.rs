// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Beacon integration tests.
//!
//! - [`MockSmsProvider`] - scripted provider that captures requests
//! - [`TestHarness`] - full dispatch stack over a temp SQLite database

pub mod harness;
pub mod mock_provider;

pub use harness::{
    TEST_CALLBACK_URL, TEST_FROM_NUMBER, TestHarness, TestHarnessBuilder, test_carriers,
};
pub use mock_provider::{CapturedSms, MockOutcome, MockSmsProvider};
