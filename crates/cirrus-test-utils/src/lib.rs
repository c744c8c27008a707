// SPDX-FileCopyrightText: 2026 Cirrus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Cirrus integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic tests that never reach AWS.
//!
//! # Components
//!
//! - [`MockCollector`] - Scripted collector with pause, delay and call recording
//! - [`MockDirectory`] - Account directory with a settable account list
//! - [`MockCredentials`] - Credential provider that can refuse accounts

pub mod harness;
pub mod mock_collector;
pub mod mock_directory;

pub use harness::{TEST_HOME_REGION, TestHarness, TestHarnessBuilder};
pub use mock_collector::{MockCollector, resource};
pub use mock_directory::{MockCredentials, MockDirectory};
