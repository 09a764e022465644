//! A tuple-prefixed trace sink.
//!
//! Calls `tracing::debug!`/`tracing::trace!`/`tracing::warn!` directly at
//! every interesting event (mutation start/success/failure, pull/push
//! activity), wrapped in a small handle so the prefix ("subspace")
//! accumulates: `logger.subspace("client").subspace(client_id)` produces a
//! child logger whose every message is tagged with the full
//! `client/<id>` path.
//!
//! Callers who never install a `tracing` subscriber get a no-op sink for
//! free, without needing a separate trait or feature flag.

use std::sync::Arc;

/// A cheap, `Clone`-able structured trace sink.
#[derive(Clone, Debug, Default)]
pub struct Logger {
    path: Arc<Vec<String>>,
}

impl Logger {
    /// The root logger, with an empty tuple prefix.
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns a child logger with `name` appended to the accumulated
    /// prefix tuple.
    pub fn subspace(&self, name: impl Into<String>) -> Self {
        let mut path = (*self.path).clone();
        path.push(name.into());
        Self {
            path: Arc::new(path),
        }
    }

    fn prefix(&self) -> String {
        self.path.join("/")
    }

    pub fn trace(&self, message: impl std::fmt::Display) {
        tracing::trace!(path = %self.prefix(), "{message}");
    }

    pub fn debug(&self, message: impl std::fmt::Display) {
        tracing::debug!(path = %self.prefix(), "{message}");
    }

    pub fn warn(&self, message: impl std::fmt::Display) {
        tracing::warn!(path = %self.prefix(), "{message}");
    }
}
