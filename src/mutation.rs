//! # Mutator registry
//!
//! A mutator is a named, deterministic function over a [`Transaction`].
//! The registry is the sole open extension point of the engine: it maps
//! names to function values, shared verbatim between a
//! [`crate::client::Client`] and a [`crate::server::Server`] so that
//! client-side rebase and server-side authoritative execution run the
//! identical code path.

use crate::errors::MutatorError;
use crate::transaction::Transaction;
use crate::types::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A named, deterministic function `(transaction, args) -> ()`.
///
/// Implementations must not close over external mutable state, perform
/// I/O, or consult non-deterministic inputs — the engine re-executes
/// mutators during rebase and on the server, and divergence between
/// those executions is undefined behavior for the protocol, not an error
/// the engine can detect.
pub trait Mutator: Send + Sync {
    fn call(&self, tx: &mut dyn Transaction, args: &[Value]) -> Result<(), MutatorError>;
}

impl<F> Mutator for F
where
    F: Fn(&mut dyn Transaction, &[Value]) -> Result<(), MutatorError> + Send + Sync,
{
    fn call(&self, tx: &mut dyn Transaction, args: &[Value]) -> Result<(), MutatorError> {
        self(tx, args)
    }
}

/// The shared set of named mutators available to both client and server.
#[derive(Clone, Default)]
pub struct MutationRegistry {
    mutators: Arc<HashMap<String, Arc<dyn Mutator>>>,
}

impl MutationRegistry {
    pub fn builder() -> MutationRegistryBuilder {
        MutationRegistryBuilder::default()
    }

    /// Looks up a mutator by name. `None` means "unknown mutator", a
    /// programming error for the caller to assert on, not a value this
    /// type surfaces as a recoverable `Result`.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Mutator>> {
        self.mutators.get(name).cloned()
    }
}

/// Builds a [`MutationRegistry`] by registering named mutators.
#[derive(Default)]
pub struct MutationRegistryBuilder {
    mutators: HashMap<String, Arc<dyn Mutator>>,
}

impl MutationRegistryBuilder {
    pub fn register(mut self, name: impl Into<String>, mutator: impl Mutator + 'static) -> Self {
        self.mutators.insert(name.into(), Arc::new(mutator));
        self
    }

    pub fn build(self) -> MutationRegistry {
        MutationRegistry {
            mutators: Arc::new(self.mutators),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::ClientTransaction;
    use serde_json::json;
    use std::collections::HashMap as StdHashMap;

    fn add(tx: &mut dyn Transaction, args: &[Value]) -> Result<(), MutatorError> {
        let delta = args[0].as_i64().unwrap_or(0);
        let current = tx.get("value").and_then(|v| v.as_i64()).unwrap_or(0);
        tx.set("value".to_string(), json!(current + delta));
        Ok(())
    }

    #[test]
    fn registry_resolves_a_registered_mutator_by_name() {
        let registry = MutationRegistry::builder().register("add", add).build();
        assert!(registry.get("add").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn resolved_mutator_runs_against_a_transaction() {
        let registry = MutationRegistry::builder().register("add", add).build();
        let mutator = registry.get("add").unwrap();
        let db: StdHashMap<String, Value> = StdHashMap::new();
        let mut tx = ClientTransaction::new(&db, "c1:1".to_string());
        mutator.call(&mut tx, &[json!(2)]).unwrap();
        assert_eq!(tx.into_patch().get("value"), Some(&json!(2)));
    }

    #[test]
    fn mutator_can_fail_without_panicking() {
        fn picky(_tx: &mut dyn Transaction, args: &[Value]) -> Result<(), MutatorError> {
            if args.is_empty() {
                return Err(MutatorError::new("missing argument"));
            }
            Ok(())
        }
        let registry = MutationRegistry::builder().register("picky", picky).build();
        let mutator = registry.get("picky").unwrap();
        let db: StdHashMap<String, Value> = StdHashMap::new();
        let mut tx = ClientTransaction::new(&db, "c1:1".to_string());
        assert!(mutator.call(&mut tx, &[]).is_err());
    }
}
