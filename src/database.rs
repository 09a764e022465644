//! # Client database
//!
//! The client's local replica: a single mapping from key to value, the
//! most recent authoritative state known to this client. This is
//! authoritative-state storage, not a TTL/SWR cache, so there is no
//! expiration, staleness tracking, or LRU eviction here.

use crate::types::{Patch, Value};
use std::collections::HashMap;

/// The client's local snapshot of authoritative state.
#[derive(Debug, Clone, Default)]
pub struct ClientDatabase {
    entries: HashMap<String, Value>,
}

impl ClientDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn as_map(&self) -> &HashMap<String, Value> {
        &self.entries
    }

    /// Overwrites every key in `patch` into the database. There is no
    /// delete sentinel: a patch can only add or overwrite.
    pub fn apply(&mut self, patch: &Patch) {
        for (key, value) in patch {
            self.entries.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn apply_overwrites_existing_keys_and_adds_new_ones() {
        let mut db = ClientDatabase::new();
        db.apply(&Patch::from([("a".to_string(), json!(1))]));
        db.apply(&Patch::from([
            ("a".to_string(), json!(2)),
            ("b".to_string(), json!(3)),
        ]));
        assert_eq!(db.get("a"), Some(&json!(2)));
        assert_eq!(db.get("b"), Some(&json!(3)));
    }

    #[test]
    fn get_of_unknown_key_is_none() {
        let db = ClientDatabase::new();
        assert_eq!(db.get("missing"), None);
    }
}
