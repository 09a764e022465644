#![doc = include_str!("../README.md")]

pub mod client;
pub mod database;
pub mod errors;
pub mod logger;
pub mod mutation;
pub mod server;
pub mod subscriptions;
pub mod transaction;
pub mod types;
pub mod wire;

pub mod prelude {
    pub use crate::client::Client;
    pub use crate::errors::{MutatorError, SyncError, SyncResult};
    pub use crate::logger::Logger;
    pub use crate::mutation::{Mutator, MutationRegistry};
    pub use crate::server::{ClientHandle, Disconnect, Server};
    pub use crate::subscriptions::Unsubscribe;
    pub use crate::transaction::Transaction;
    pub use crate::types::{ClientId, Cookie, Key, MutationId, MutationRequest, Patch, Value};
}
