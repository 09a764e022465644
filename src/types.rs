//! Core data types shared by the client and server halves of the engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque, JSON-serializable datum. The engine never inspects value shape.
pub type Value = serde_json::Value;

/// A key in the replicated database.
pub type Key = String;

/// Identifies a client across the lifetime of a server.
pub type ClientId = String;

/// A fresh opaque string minted per local mutation invocation.
pub type MutationId = String;

/// A server version / client cookie: the count of patches observed so far.
/// `0` means "give me everything".
pub type Cookie = u64;

/// A set of writes produced by a single logical mutation (or a merged
/// range of them). Absence of a key means "no change" — there is no
/// delete sentinel.
pub type Patch = HashMap<Key, Value>;

/// Merge a sequence of patches left-to-right, newest-last wins.
pub fn merge_patches<'a>(patches: impl IntoIterator<Item = &'a Patch>) -> Patch {
    let mut merged = Patch::new();
    for patch in patches {
        merged.extend(patch.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged
}

/// A single mutation as submitted by a client: the mutator name (`key`)
/// plus its arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MutationRequest {
    pub mutation_id: MutationId,
    pub key: String,
    pub args: Vec<Value>,
}
