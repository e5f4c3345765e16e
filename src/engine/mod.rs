//! Accounting engines applied by the event handlers.
//!
//! `rate_brackets` moves principal between interest-rate brackets inside the
//! event's transaction; `lifecycle` and `points` are pure rules over loaded
//! entities.

pub mod lifecycle;
pub mod points;
pub mod rate_brackets;

pub use lifecycle::{ensure_not_terminal, record_redemption, touch_by_user, LeverageUpdate};
pub use points::{PointsError, PointsWeights, WeightsError};
pub use rate_brackets::{apply_principal_rate_change, PrincipalRateChange};
