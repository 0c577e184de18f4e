//! Pool configuration.

use meridian_types::{genesis, Hash256};
use serde::{Deserialize, Serialize};

/// Default cap on transactions handed to a block proposal.
pub const DEFAULT_MAX_TX_IN_BLOCK: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MempoolConfig {
    /// Upper bound for `get_ordered(true)`. Zero means unlimited.
    pub max_tx_in_block: usize,
    /// Asset whose surplus pays system and network fees.
    pub utility_asset: Hash256,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_tx_in_block: DEFAULT_MAX_TX_IN_BLOCK,
            utility_asset: genesis::utility_token_id(),
        }
    }
}

impl MempoolConfig {
    pub fn with_max_tx_in_block(mut self, max: usize) -> Self {
        self.max_tx_in_block = max;
        self
    }

    pub fn with_utility_asset(mut self, asset_id: Hash256) -> Self {
        self.utility_asset = asset_id;
        self
    }
}
