// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors on the one path that propagates: handler failure.
//!
//! Configuration misuse never errors; it degrades to a no-op. A handler that
//! fails, however, must not be swallowed: its [`HandlerError`] travels out of
//! [`Registry::handle_event`](crate::Registry::handle_event),
//! [`Registry::fire_timer`](crate::Registry::fire_timer) and
//! [`Registry::trigger`](crate::Registry::trigger) as a [`DispatchError`] so
//! the host can report it through its own channel.

use alloc::string::String;

/// Error returned by a handler.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Create an error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// What handlers return.
pub type HandlerResult = Result<(), HandlerError>;

/// Error surfaced to the host from a dispatch.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The interaction's handler failed.
    #[error("handler of interaction `{id}` failed: {source}")]
    Handler {
        /// Caller id of the interaction.
        id: String,
        /// The handler's error.
        source: HandlerError,
    },
}
