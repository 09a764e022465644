//! Wire-shaped request/response payloads for the push/pull protocol,
//! with camelCase wire fields. Every field here is owned data (`Clone`),
//! so a payload is value-copied across the transport boundary with no
//! shared mutable references.

use crate::types::{ClientId, Cookie, MutationId, MutationRequest, Patch};
use serde::{Deserialize, Serialize};

/// A `push` request: one client submitting a batch of mutations to be
/// executed authoritatively, in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    pub client_id: ClientId,
    pub mutations: Vec<MutationRequest>,
}

/// A `pull` request: a client asking for everything since `cookie`
/// (`0` meaning "give me everything").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub client_id: ClientId,
    #[serde(default)]
    pub cookie: Cookie,
}

/// A `pull` response: the merged patch since the request's cookie, the
/// server's new cookie, and — if the server has one pending for this
/// client — the id of the last mutation from this client it has
/// incorporated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    pub cookie: Cookie,
    pub patch: Patch,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_mutation_id: Option<MutationId>,
}
