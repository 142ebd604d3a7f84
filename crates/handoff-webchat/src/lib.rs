// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP adapter for the webchat-style vendor conversational API.
//!
//! Implements [`VendorAdapter`](handoff_core::VendorAdapter) over the
//! vendor's REST surface: user registration, conversation creation, message
//! posting, and history listing. Handles authentication headers, the
//! already-exists registration path, and transient-error retry.

pub mod client;
pub mod types;

pub use client::{WebchatClient, WebchatConfig};
