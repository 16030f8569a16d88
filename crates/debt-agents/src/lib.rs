//! Agent layer of the technical-debt analysis pipeline.
//!
//! `adjudication` holds the conflict-resolution core; this crate drives it:
//! the roster of LLM-backed agents, the uniform runner that turns tool-calls
//! into findings, the dependency-graph analyzer, the four-phase pipeline,
//! and the bundled adapters the CLI wires together.

pub mod adapters;
pub mod config;
pub mod graph;
pub mod metrics;
pub mod pipeline;
pub mod prompts;
pub mod retry;
pub mod roster;
pub mod runner;
pub mod telemetry;
pub mod tools;

pub use config::PipelineSettings;
pub use metrics::ScanMetrics;
pub use pipeline::{ScanError, ScanOutcome, ScanPhase, ScanPipeline, ScanRequest};
pub use roster::{AgentSpec, Roster};
