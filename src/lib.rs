pub mod api;
pub mod chain;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use chain::{ChainClient, ChainError, MockChain, StarknetRpcClient};
pub use config::Config;
pub use db::{init_db, Repository, Store};
pub use domain::{Address, BlockInfo, ChainEvent, EventEnvelope, Trove, TroveStatus, U256};
pub use engine::PointsWeights;
pub use error::{AppError, IndexerError};
pub use orchestration::{replay_file, Indexer};
