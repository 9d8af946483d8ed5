//! Drives one console session through every app's phase plan.
//!
//! The engine never talks to a browser directly. It sees the world through
//! [`ConsoleSession`], which `vitals-browser` implements over Chrome and the
//! tests implement with scripted responses.

mod error;
mod orchestrator;
mod sequencer;
mod session;
mod supervisor;

pub use error::{Error, Result};
pub use orchestrator::{BatchOptions, Clock, Orchestrator};
pub use sequencer::{collect_app, settle_pause};
pub use session::ConsoleSession;
pub use supervisor::{Supervisor, SupervisorConfig, WaitOutcome, WaitPolicy, discard_for};
