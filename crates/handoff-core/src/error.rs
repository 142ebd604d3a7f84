// SPDX-FileCopyrightText: 2026 Handoff Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Handoff conversation core.

use thiserror::Error;

/// The primary error type used across all Handoff adapter traits and core operations.
#[derive(Debug, Error)]
pub enum HandoffError {
    /// Configuration errors (missing required fields, invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Document store errors (connection, query failure, serialization).
    #[error("store error: {source}")]
    Store {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Vendor conversational API errors (HTTP failure, unusable response body).
    #[error("vendor error: {message}")]
    Vendor {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HandoffError {
    /// Wraps any error as a store error.
    pub fn store(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        HandoffError::Store {
            source: source.into(),
        }
    }

    /// Wraps a message as a sourceless vendor error.
    pub fn vendor(message: impl Into<String>) -> Self {
        HandoffError::Vendor {
            message: message.into(),
            source: None,
        }
    }
}
