// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the Handoff conversation core.

pub mod adapter;
pub mod store;
pub mod vendor;

pub use adapter::PluginAdapter;
pub use store::StoreAdapter;
pub use vendor::VendorAdapter;
