//! Transaction views over client and server state.

use crate::types::{MutationId, Patch, Value};
use std::collections::HashMap;

/// Shared read/write surface a mutator operates through. `get` sees the
/// mutator's own pending writes layered over the underlying snapshot;
/// `set` only ever writes to the patch buffer. There is no `delete`;
/// tombstones are out of scope.
pub trait Transaction {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: String, value: Value);
}

/// Client-side transaction: an immutable view of the client DB plus a
/// fresh patch buffer. Carries the `mutation_id` minted for this
/// invocation at construction time.
pub struct ClientTransaction<'a> {
    db: &'a HashMap<String, Value>,
    patch: Patch,
    mutation_id: MutationId,
}

impl<'a> ClientTransaction<'a> {
    pub fn new(db: &'a HashMap<String, Value>, mutation_id: MutationId) -> Self {
        Self {
            db,
            patch: Patch::new(),
            mutation_id,
        }
    }

    pub fn mutation_id(&self) -> &MutationId {
        &self.mutation_id
    }

    /// Consumes the transaction, returning the patch it accumulated.
    pub fn into_patch(self) -> Patch {
        self.patch
    }
}

impl Transaction for ClientTransaction<'_> {
    fn get(&self, key: &str) -> Option<Value> {
        self.patch.get(key).cloned().or_else(|| self.db.get(key).cloned())
    }

    fn set(&mut self, key: String, value: Value) {
        self.patch.insert(key, value);
    }
}

/// Server-side transaction: a view over the patch-log sequence plus a
/// fresh patch buffer. The buffer is appended to the log in one atomic
/// step by the server once the mutator returns.
pub struct ServerTransaction<'a> {
    log: &'a [Patch],
    patch: Patch,
}

impl<'a> ServerTransaction<'a> {
    pub fn new(log: &'a [Patch]) -> Self {
        Self {
            log,
            patch: Patch::new(),
        }
    }

    pub fn into_patch(self) -> Patch {
        self.patch
    }
}

impl Transaction for ServerTransaction<'_> {
    fn get(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.patch.get(key) {
            return Some(value.clone());
        }
        self.log
            .iter()
            .rev()
            .find_map(|patch| patch.get(key))
            .cloned()
    }

    fn set(&mut self, key: String, value: Value) {
        self.patch.insert(key, value);
    }
}
