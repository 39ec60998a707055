//! # memhog-core
//!
//! Fault-injection orchestrator for the memhog memory-pressure experiment.
//!
//! This crate runs a `dd`-based memory stress inside every target, holds
//! the pressure for the configured duration, and always issues the kill
//! command afterwards:
//! - [`StressRunner`] launches one stress invocation and reports its outcome
//! - [`Reverter`] runs the kill command against one or all targets
//! - [`AbortWatcher`] turns SIGINT/SIGTERM into a cancellation token
//! - [`Orchestrator`] races stress reports, abort and the duration timer
//! - [`Experiment`] wraps the orchestrator with selection, probes and ramp time
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────┐
//!  Experiment ───►│ Orchestrator │◄──── AbortWatcher (CancellationToken)
//!                 └──┬────────┬──┘
//!        spawn       │        │      kill
//!   ┌────────────────┘        └──────────────┐
//!   ▼                                        ▼
//! StressRunner ── report (mpsc) ──►      Reverter
//!   │                                        │
//!   └──────────► RemoteExecutor ◄────────────┘
//! ```
//!
//! Targets move through `injected` → `reverted` in the shared
//! [`TargetStatusMap`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod abort;
pub mod collab;
pub mod config;
pub mod exec;
pub mod experiment;
pub mod orchestrator;
pub mod revert;
pub mod select;
pub mod status;
pub mod stress;

pub use abort::AbortWatcher;
pub use collab::{
    EventReporter, InMemoryResultStore, LogReporter, PersistError, ProbeRunner, ResultStore,
    StaticTargetSource, TargetSource,
};
pub use config::{Config, ConfigError, ProbeConfig};
pub use exec::{ExecError, ExecOutput, MockExecutor, RemoteExecutor, StressBehavior};
pub use experiment::Experiment;
pub use orchestrator::{bind_targets, resolve_container, Orchestrator};
pub use revert::Reverter;
pub use status::TargetStatusMap;
pub use stress::{classify, StressReport, StressRunner};
