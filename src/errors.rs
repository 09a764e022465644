//! Structured error types for the replication engine.
//!
//! Draws a line between *programming errors* (unknown mutator name —
//! these panic, they never become a `SyncError`) and *recoverable*
//! failures (a mutator raising during execution), which are represented
//! here and only ever logged, never returned from `push` itself.

use thiserror::Error;

/// An error raised by a mutator's own business logic while it runs against
/// a transaction. Mutator authors construct this with `MutatorError::new`;
/// the engine never inspects its contents beyond logging them.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct MutatorError(pub String);

impl MutatorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for MutatorError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for MutatorError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// Errors surfaced by the synchronization engine itself.
///
/// `mutate`, `watch`, and `get` never return this type. It exists purely
/// to give `push`/rebase a structured value to log when a mutator fails
/// during authoritative or rebased execution — the batch proceeds either
/// way, this is never propagated to a caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// A mutator raised while the server executed it authoritatively.
    #[error("mutator `{name}` failed: {source}")]
    MutatorFailed {
        name: String,
        #[source]
        source: MutatorError,
    },

    /// A mutation referenced a name absent from the registry. Always a
    /// programming error: the caller asserts on it via `panic!`, it is
    /// never returned as a `Result`.
    #[error("unknown mutator `{0}`")]
    UnknownMutator(String),
}

pub type SyncResult<T> = Result<T, SyncError>;
