//! The authoritative server.

use crate::errors::SyncError;
use crate::logger::Logger;
use crate::mutation::MutationRegistry;
use crate::transaction::ServerTransaction;
use crate::types::{ClientId, Cookie, MutationId, MutationRequest, Patch};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A live connection to a client, as seen from the server. `poke` is a
/// contentless, fire-and-forget notification meaning "there may be news,
/// pull". Implementations typically bridge this to an in-process
/// [`crate::client::Client`] or to a real transport.
pub trait ClientHandle: Send + Sync {
    fn poke(&self);
}

struct ServerState {
    log: Vec<Patch>,
    pending_last_mutation: HashMap<ClientId, MutationId>,
    handles: Vec<(u64, Arc<dyn ClientHandle>)>,
    next_handle_id: u64,
}

impl ServerState {
    fn new(initial: Patch) -> Self {
        let log = if initial.is_empty() {
            Vec::new()
        } else {
            vec![initial]
        };
        Self {
            log,
            pending_last_mutation: HashMap::new(),
            handles: Vec::new(),
            next_handle_id: 0,
        }
    }

    fn version(&self) -> Cookie {
        self.log.len() as Cookie
    }
}

/// Returned by [`Server::connect_to_client`]. Calling [`Disconnect::call`]
/// removes the handle; calling it twice (or on an already-removed handle)
/// is a no-op.
pub struct Disconnect {
    id: u64,
    state: Arc<Mutex<ServerState>>,
}

impl Disconnect {
    pub fn call(self) {
        if let Ok(mut state) = self.state.lock() {
            state.handles.retain(|(id, _)| *id != self.id);
        }
    }
}

/// The server: an ordered, append-only log of patches plus per-client
/// bookkeeping. A server instance owns its log outright — there is no
/// global state; multiple servers may coexist in one process.
#[derive(Clone)]
pub struct Server {
    logger: Logger,
    mutations: MutationRegistry,
    state: Arc<Mutex<ServerState>>,
}

impl Server {
    /// Creates a server with an empty log.
    pub fn new(mutations: MutationRegistry) -> Self {
        Self::with_initial_state(mutations, Patch::new())
    }

    /// Creates a server whose log starts with one patch representing
    /// `initial` state, if non-empty. This is the seam an implementation
    /// would use to restore a log from durable storage.
    pub fn with_initial_state(mutations: MutationRegistry, initial: Patch) -> Self {
        Self {
            logger: Logger::root().subspace("server"),
            mutations,
            state: Arc::new(Mutex::new(ServerState::new(initial))),
        }
    }

    /// Registers a client handle exposing `poke()`. Removing a
    /// non-present handle (via the returned [`Disconnect`]) is a no-op.
    pub fn connect_to_client(&self, handle: Arc<dyn ClientHandle>) -> Disconnect {
        let mut state = self.state.lock().expect("server state poisoned");
        let id = state.next_handle_id;
        state.next_handle_id += 1;
        state.handles.push((id, handle));
        Disconnect {
            id,
            state: self.state.clone(),
        }
    }

    /// Newest-first scan across the patch log.
    pub fn get(&self, key: &str) -> Option<crate::types::Value> {
        let state = self.state.lock().expect("server state poisoned");
        state.log.iter().rev().find_map(|patch| patch.get(key)).cloned()
    }

    /// Executes each mutation in order against a fresh [`ServerTransaction`],
    /// appends its patch to the log, records the id of the last mutation in
    /// the batch as this client's pending ack, and pokes every connected
    /// client (including the sender). Pushes never fail from the caller's
    /// point of view: an unknown mutator name is a programming error and
    /// panics; a mutator that raises is logged and that single mutation's
    /// patch is skipped, while the rest of the batch still lands.
    pub async fn push(&self, client_id: ClientId, mutations: Vec<MutationRequest>) {
        let handles = {
            let mut state = self.state.lock().expect("server state poisoned");
            for mutation in &mutations {
                let mutator = self.mutations.get(&mutation.key).unwrap_or_else(|| {
                    panic!("{}", SyncError::UnknownMutator(mutation.key.clone()));
                });
                let mut tx = ServerTransaction::new(&state.log);
                match mutator.call(&mut tx, &mutation.args) {
                    Ok(()) => {
                        state.log.push(tx.into_patch());
                    }
                    Err(source) => {
                        self.logger.warn(SyncError::MutatorFailed {
                            name: mutation.key.clone(),
                            source,
                        });
                    }
                }
            }
            if let Some(last) = mutations.last() {
                state
                    .pending_last_mutation
                    .insert(client_id, last.mutation_id.clone());
            }
            state.handles.iter().map(|(_, h)| h.clone()).collect::<Vec<_>>()
        };

        for handle in handles {
            handle.poke();
        }
    }

    /// Computes the merged patch since `cookie` (clamped to the current
    /// version if it is ahead of it), consumes and returns this client's
    /// pending last-mutation-id if one is waiting, and returns the
    /// server's current version as the new cookie.
    pub async fn pull(&self, client_id: &str, cookie: Cookie) -> crate::wire::PullResponse {
        let mut state = self.state.lock().expect("server state poisoned");
        let version = state.version();
        let from = (cookie as usize).min(state.log.len());
        let patch = crate::types::merge_patches(state.log[from..].iter());
        let last_mutation_id = state.pending_last_mutation.remove(client_id);
        crate::wire::PullResponse {
            cookie: version,
            patch,
            last_mutation_id,
        }
    }
}
