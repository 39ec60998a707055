//! # memhog-types
//!
//! Shared types for the memhog memory-pressure fault injector.
//!
//! This crate provides the foundational types used across all memhog crates:
//! - [`Instance`], [`Target`], [`TargetSelector`], [`TargetStatus`] - What gets stressed
//! - [`StressSpec`], [`SchedulingPolicy`] - How it gets stressed
//! - [`InjectionOutcome`], [`RunResult`], [`ResultStatus`] - What happened
//! - [`ChaosError`], [`ErrorKind`] - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod outcome;
mod spec;
mod target;

pub use error::{ChaosError, ErrorKind, RevertFailure};
pub use outcome::{InjectionOutcome, ResultStatus, RunResult, TargetOutcome, Verdict};
pub use spec::{SchedulingPolicy, StressSpec, DEFAULT_KILL_COMMAND, OOM_EXIT_CODE};
pub use target::{Instance, Target, TargetSelector, TargetStatus};
