//! # dealwatch agent
//!
//! The decision loop that drives a monitoring session:
//!
//! 1. **Decide** — a [`Policy`](dealwatch_core::Policy) proposes the next action
//! 2. **Dispatch** — [`Dispatcher`] fills arguments from state and calls the capability
//! 3. **Reduce** — [`Reducer`] merges the result into the session state
//! 4. **Route** — terminate, wait for the next poll, or decide again

pub mod dispatcher;
pub mod loop_runner;
pub mod policy;
pub mod reducer;
pub mod scheduler;
pub mod termination;

#[cfg(test)]
mod test_helpers;

pub use dispatcher::{Dispatch, Dispatcher};
pub use loop_runner::{ControlLoop, SessionOutcome, SessionReport};
pub use policy::{LlmPolicy, RulePolicy, build_policy};
pub use reducer::Reducer;
pub use scheduler::{PollScheduler, WaitResult};
pub use termination::{Termination, evaluate, is_terminal};
