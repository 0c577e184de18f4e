//! Execution limits.

use serde::{Deserialize, Serialize};

/// Resource limits applied to every script the engine runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Instructions executed per `call` before the engine faults.
    pub max_steps: u64,
    /// Items across every evaluation, alt and result stack.
    pub max_stack_size: usize,
    /// Largest byte array a push or splice may produce.
    pub max_item_size: usize,
    /// Largest integer operand or result, in bytes.
    pub max_integer_size: usize,
    pub max_array_size: usize,
    pub max_invocation_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: 1_000_000,
            max_stack_size: 2 * 1024,
            max_item_size: 1024 * 1024,
            max_integer_size: 32,
            max_array_size: 1024,
            max_invocation_depth: 1024,
        }
    }
}

impl EngineConfig {
    pub fn with_max_steps(mut self, steps: u64) -> Self {
        self.max_steps = steps;
        self
    }

    pub fn with_max_stack_size(mut self, size: usize) -> Self {
        self.max_stack_size = size;
        self
    }

    pub fn with_max_item_size(mut self, size: usize) -> Self {
        self.max_item_size = size;
        self
    }

    pub fn with_max_array_size(mut self, size: usize) -> Self {
        self.max_array_size = size;
        self
    }

    pub fn with_max_invocation_depth(mut self, depth: usize) -> Self {
        self.max_invocation_depth = depth;
        self
    }
}
