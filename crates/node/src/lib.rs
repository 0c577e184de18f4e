//! Meridian node.
//!
//! [`NodeStateMachine`] composes the transaction pool and the dBFT
//! consensus service over one ledger. The runner feeds it `Event`s and
//! performs the `Action`s it returns.

mod state;
pub mod telemetry;

pub use state::NodeStateMachine;
pub use telemetry::{init_logging, LoggingConfig, TelemetryError};
