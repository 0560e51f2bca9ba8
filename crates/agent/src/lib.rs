//! The chat loop of Standin.
//!
//! One turn runs as a small state machine:
//!
//! 1. **Seed** the conversation with the persona prompt, prior history and
//!    the visitor's message
//! 2. **AwaitingModel**: send the messages and tool definitions
//! 3. **DispatchingTools**: run every requested call, append the results as
//!    tool messages, and go back to 2
//! 4. **Done**: the model answered with text only
//!
//! The number of tool rounds per turn is bounded; a model that keeps asking
//! for tools gets a fixed fallback reply instead of looping forever.

pub mod loop_runner;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use loop_runner::{AgentLoop, EMPTY_REPLY_FALLBACK, RUNAWAY_FALLBACK, TurnOutcome};
