use crate::fixed::Fixed64;
use crate::hash::{Hash256, ProgramHash};
use std::collections::BTreeMap;

/// Per-asset balances held by one program hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub program_hash: ProgramHash,
    pub balances: BTreeMap<Hash256, Fixed64>,
}

impl Account {
    pub fn new(program_hash: ProgramHash) -> Self {
        Self {
            program_hash,
            balances: BTreeMap::new(),
        }
    }

    pub fn balance(&self, asset_id: &Hash256) -> Fixed64 {
        self.balances.get(asset_id).copied().unwrap_or_default()
    }

    pub fn credit(&mut self, asset_id: Hash256, value: Fixed64) {
        *self.balances.entry(asset_id).or_default() += value;
    }

    pub fn debit(&mut self, asset_id: Hash256, value: Fixed64) {
        *self.balances.entry(asset_id).or_default() -= value;
    }
}
