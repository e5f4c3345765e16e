//! Domain types for the trove indexer.
//!
//! This module provides:
//! - Lossless 256-bit integers and canonical chain addresses
//! - Persisted entities: collaterals, troves, brackets, batches, borrowers, points
//! - The time-weighted debt accumulator shared by brackets and batches
//! - Decoded contract events

pub mod accrual;
pub mod borrower;
pub mod bracket;
pub mod collateral;
pub mod events;
pub mod points;
pub mod primitives;
pub mod trove;
pub mod uint;

pub use accrual::{AccrualError, DebtAccumulator, ONE_YEAR};
pub use borrower::{BorrowerInfo, NegativeTroveCount};
pub use bracket::{bracket_id, bracket_rate, InterestBatch, InterestRateBracket};
pub use collateral::{Collateral, CollateralAddresses, ContractSource, SourceTemplate};
pub use events::{ChainEvent, EventEnvelope, Operation, Receipt, SignedAmount, SpOperation};
pub use points::{sp_position_id, PointsUser, StabilityPoolPosition};
pub use primitives::{Address, AddressParseError, BlockInfo};
pub use trove::{batch_full_id, trove_full_id, Trove, TroveStatus};
pub use uint::{parse_u256, DECIMAL_PRECISION, U256};
