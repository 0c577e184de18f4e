//! The state machine contract.

use crate::{Action, Event};
use std::time::Duration;

/// A deterministic event handler.
///
/// Time is injected by the runner through [`StateMachine::set_time`]; a state
/// machine never reads the wall clock itself.
pub trait StateMachine {
    /// Process one event and return the actions it causes.
    fn handle(&mut self, event: Event) -> Vec<Action>;

    /// Set the current time, as a duration since the Unix epoch.
    fn set_time(&mut self, now: Duration);

    fn now(&self) -> Duration;
}
