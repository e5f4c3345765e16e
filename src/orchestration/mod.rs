//! Event routing: source lookup, per-event transactions and replay.

pub mod handlers;
pub mod indexer;
pub mod replay;

pub use indexer::Indexer;
pub use replay::{replay_file, ReplayError};
