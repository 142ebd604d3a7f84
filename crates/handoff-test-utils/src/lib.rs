// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Handoff integration tests.
//!
//! Provides a mock vendor adapter and a test harness for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockVendor`] - Mock vendor conversational API with pre-configured replies
//! - [`TestHarness`] - Temp-database store, mock vendor, and a ready chat session

pub mod harness;
pub mod mock_vendor;

pub use harness::TestHarness;
pub use mock_vendor::MockVendor;
