//! Consensus timing configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest exponent applied to the round timeout.
pub const MAX_TIMEOUT_SHIFT: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BftConfig {
    /// Target interval between blocks. Also the base round timeout.
    pub block_time: Duration,

    /// How far a proposal timestamp may run ahead of the local clock.
    pub max_timestamp_drift: Duration,
}

impl Default for BftConfig {
    fn default() -> Self {
        Self {
            block_time: Duration::from_secs(6),
            max_timestamp_drift: Duration::from_secs(10 * 60),
        }
    }
}

impl BftConfig {
    pub fn with_block_time(mut self, block_time: Duration) -> Self {
        self.block_time = block_time;
        self
    }

    pub fn with_max_timestamp_drift(mut self, drift: Duration) -> Self {
        self.max_timestamp_drift = drift;
        self
    }

    /// Round timeout after `exponent` doublings: `block_time << exponent`.
    ///
    /// The exponent is capped at [`MAX_TIMEOUT_SHIFT`].
    pub fn timeout(&self, exponent: u32) -> Duration {
        self.block_time * (1u32 << exponent.min(MAX_TIMEOUT_SHIFT))
    }
}
