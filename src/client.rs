//! The client: local DB, optimistic queue, subscriptions, and the
//! pull/rebase logic.

use crate::database::ClientDatabase;
use crate::errors::SyncError;
use crate::logger::Logger;
use crate::mutation::MutationRegistry;
use crate::server::{ClientHandle, Server};
use crate::subscriptions::{SubscriptionRegistry, Unsubscribe};
use crate::transaction::{ClientTransaction, Transaction};
use crate::types::{ClientId, Cookie, MutationId, MutationRequest, Patch, Value};
use crate::wire::PullResponse;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// A pending, not-yet-acknowledged mutation: the latest recomputed patch
/// for a mutation the server hasn't acked.
struct OptimisticRecord {
    mutation_id: MutationId,
    key: String,
    args: Vec<Value>,
    patch: Patch,
}

struct ClientState {
    db: ClientDatabase,
    /// `None` until the initial pull completes.
    cookie: Option<Cookie>,
    queue: VecDeque<OptimisticRecord>,
    /// Set when a poke arrives before the initial pull resolves; replayed
    /// once it does, rather than silently dropped.
    poke_pending: bool,
}

/// Returns the effective value for `key`: the newest optimistic
/// record whose patch contains `key`, otherwise the DB value.
fn effective_value(state: &ClientState, key: &str) -> Option<Value> {
    state
        .queue
        .iter()
        .rev()
        .find_map(|record| record.patch.get(key).cloned())
        .or_else(|| state.db.get(key).cloned())
}

/// A client replica. Construction schedules an immediate initial pull;
/// until it resolves, `cookie` is `None` and any poke that arrives is
/// queued rather than acted on.
#[derive(Clone)]
pub struct Client {
    id: ClientId,
    logger: Logger,
    mutations: MutationRegistry,
    server: Server,
    subscriptions: SubscriptionRegistry,
    next_seq: Arc<AtomicU64>,
    state: Arc<Mutex<ClientState>>,
    push_queue: mpsc::UnboundedSender<MutationRequest>,
}

impl Client {
    /// Creates a client, registers it with `server`, and schedules the
    /// initial pull. Requires a running async executor (the spawn happens
    /// immediately).
    ///
    /// Pushes are dispatched by a single background task draining an
    /// ordered queue, one at a time, so that mutations issued in quick
    /// succession from this client reach the server in invocation order
    /// even under a multi-threaded executor — a bare `tokio::spawn` per
    /// `mutate()` call would let two pushes race for the server's lock in
    /// whichever order their tasks happened to be scheduled.
    pub fn new(id: impl Into<ClientId>, server: Server, mutations: MutationRegistry) -> Self {
        let id = id.into();
        let (push_queue, mut push_rx) = mpsc::unbounded_channel::<MutationRequest>();
        let client = Self {
            logger: Logger::root().subspace("client").subspace(id.clone()),
            id,
            mutations,
            server,
            subscriptions: SubscriptionRegistry::new(),
            next_seq: Arc::new(AtomicU64::new(0)),
            state: Arc::new(Mutex::new(ClientState {
                db: ClientDatabase::new(),
                cookie: None,
                queue: VecDeque::new(),
                poke_pending: false,
            })),
            push_queue,
        };

        let handle: Arc<dyn ClientHandle> = Arc::new(client.clone());
        let _ = client.server.connect_to_client(handle);

        let pusher_server = client.server.clone();
        let pusher_id = client.id.clone();
        tokio::spawn(async move {
            while let Some(request) = push_rx.recv().await {
                pusher_server.push(pusher_id.clone(), vec![request]).await;
            }
        });

        let initial = client.clone();
        tokio::spawn(async move {
            initial.pull_and_apply(0).await;
        });

        client
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Connects this client to `server`, keeping the [`crate::server::Disconnect`]
    /// handle so the caller can disconnect later instead of leaking the
    /// registration for the client's whole lifetime.
    pub fn connect(&self) -> crate::server::Disconnect {
        let handle: Arc<dyn ClientHandle> = Arc::new(self.clone());
        self.server.connect_to_client(handle)
    }

    /// The value from the newest optimistic record touching `key`,
    /// else the DB value, else `None`.
    pub fn get(&self, key: &str) -> Option<Value> {
        let state = self.state.lock().expect("client state poisoned");
        effective_value(&state, key)
    }

    /// Registers `callback` for `key`. Does not deliver an immediate
    /// value — call [`Client::get`] first if you need one.
    pub fn watch(
        &self,
        key: impl Into<String>,
        callback: impl Fn(Option<Value>) + Send + Sync + 'static,
    ) -> Unsubscribe {
        self.subscriptions.watch(key, callback)
    }

    /// Runs the named mutator against a fresh transaction over the
    /// current DB, applies the patch optimistically, notifies watchers of
    /// every key it touched, then pushes it to the server in the
    /// background. An unknown mutator name is a programming error and
    /// panics; a mutator that raises also panics here (surfacing
    /// synchronously at the call site), unlike during rebase or server
    /// push, where the same failure is only logged and skipped.
    pub fn mutate(&self, name: &str, args: &[Value]) {
        let mutator = self
            .mutations
            .get(name)
            .unwrap_or_else(|| panic!("{}", SyncError::UnknownMutator(name.to_string())));

        let (mutation_id, emits, request) = {
            let mut state = self.state.lock().expect("client state poisoned");
            let mutation_id = format!("{}:{}", self.id, self.next_seq.fetch_add(1, Ordering::SeqCst));
            let mut tx = ClientTransaction::new(state.db.as_map(), mutation_id.clone());
            if let Err(source) = mutator.call(&mut tx, args) {
                drop(tx);
                let err = SyncError::MutatorFailed {
                    name: name.to_string(),
                    source,
                };
                self.logger.warn(&err);
                panic!("{err}");
            }
            let patch = tx.into_patch();
            let emit_keys: Vec<String> = patch.keys().cloned().collect();

            state.queue.push_back(OptimisticRecord {
                mutation_id: mutation_id.clone(),
                key: name.to_string(),
                args: args.to_vec(),
                patch,
            });

            let emits: Vec<(String, Option<Value>)> = emit_keys
                .into_iter()
                .map(|key| {
                    let value = effective_value(&state, &key);
                    (key, value)
                })
                .collect();

            let request = MutationRequest {
                mutation_id: mutation_id.clone(),
                key: name.to_string(),
                args: args.to_vec(),
            };

            (mutation_id, emits, request)
        };
        let _ = &mutation_id;

        for (key, value) in emits {
            self.subscriptions.notify(&key, value);
        }

        // Enqueued rather than spawned directly: the background pusher
        // task drains this queue one request at a time, preserving
        // invocation order regardless of executor scheduling.
        let _ = self.push_queue.send(request);
    }

    async fn pull_and_apply(&self, cookie: Cookie) {
        let response = self.server.pull(&self.id, cookie).await;
        self.on_pull(response);
    }

    /// Reconciles a pull response with local state: on the initial pull,
    /// overwrites the DB outright; on an ack, applies the authoritative
    /// patch and rebases every outstanding optimistic record after the
    /// acked one against the new DB, dropping any that now fail.
    fn on_pull(&self, response: PullResponse) {
        let mut state = self.state.lock().expect("client state poisoned");

        let Some(acked_id) = response.last_mutation_id.clone() else {
            // Initial pull: overwrite the DB, set the cookie, emit every
            // key in the patch.
            state.db.apply(&response.patch);
            state.cookie = Some(response.cookie);
            let poke_was_pending = state.poke_pending;
            state.poke_pending = false;

            let emits: Vec<(String, Option<Value>)> = response
                .patch
                .keys()
                .map(|key| (key.clone(), effective_value(&state, key)))
                .collect();
            drop(state);

            for (key, value) in emits {
                self.subscriptions.notify(&key, value);
            }
            if poke_was_pending {
                self.poke();
            }
            return;
        };

        let Some(pos) = state
            .queue
            .iter()
            .position(|record| record.mutation_id == acked_id)
        else {
            self.logger
                .warn(format!("ack for unknown mutation id `{acked_id}`"));
            return;
        };

        state.db.apply(&response.patch);
        let mut emit_keys: HashSet<String> = response.patch.keys().cloned().collect();

        let mut rebased = VecDeque::with_capacity(state.queue.len() - pos - 1);
        for index in (pos + 1)..state.queue.len() {
            let record = &state.queue[index];
            let mutator = self
                .mutations
                .get(&record.key)
                .unwrap_or_else(|| panic!("{}", SyncError::UnknownMutator(record.key.clone())));
            let mut tx = ClientTransaction::new(state.db.as_map(), record.mutation_id.clone());
            match mutator.call(&mut tx, &record.args) {
                Ok(()) => {
                    let new_patch = tx.into_patch();
                    emit_keys.extend(new_patch.keys().cloned());
                    rebased.push_back(OptimisticRecord {
                        mutation_id: record.mutation_id.clone(),
                        key: record.key.clone(),
                        args: record.args.clone(),
                        patch: new_patch,
                    });
                }
                Err(source) => {
                    self.logger.warn(SyncError::MutatorFailed {
                        name: record.key.clone(),
                        source,
                    });
                }
            }
        }
        state.queue = rebased;
        state.cookie = Some(response.cookie);

        let emits: Vec<(String, Option<Value>)> = emit_keys
            .into_iter()
            .map(|key| {
                let value = effective_value(&state, &key);
                (key, value)
            })
            .collect();
        drop(state);

        for (key, value) in emits {
            self.subscriptions.notify(&key, value);
        }
    }
}

impl ClientHandle for Client {
    /// Inbound from the server: "there may be news; pull." Dropped (well,
    /// queued) if the initial pull hasn't resolved yet; otherwise spawns a
    /// background pull using the client's current cookie.
    fn poke(&self) {
        let this = self.clone();
        tokio::spawn(async move {
            let cookie = {
                let mut state = this.state.lock().expect("client state poisoned");
                match state.cookie {
                    None => {
                        state.poke_pending = true;
                        None
                    }
                    Some(cookie) => Some(cookie),
                }
            };
            if let Some(cookie) = cookie {
                this.pull_and_apply(cookie).await;
            }
        });
    }
}
