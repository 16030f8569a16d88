//! Adjudication core for the technical-debt analysis swarm.
//!
//! This crate holds everything the pipeline needs to turn disagreeing agent
//! claims into one coherent result:
//! - Finding and message types shared by every agent
//! - The process-local message bus with thread reconstruction
//! - The bounded debate protocol and its resolution rules
//! - Structural conflict detection and evidence/arbiter resolution
//! - Weighted voting over per-debt-type weight rows
//! - Remediation-plan synthesis from surviving findings
//!
//! Transport concerns (LLM, repository snapshots, persistence) are ports —
//! trait objects injected by the caller. Nothing here performs I/O beyond
//! what an injected port does.

pub mod bus;
pub mod config;
pub mod conflict;
pub mod debate;
pub mod error;
pub mod finding;
pub mod identity;
pub mod message;
pub mod plan;
pub mod ports;
pub mod voting;

pub use bus::{MessageBus, MessageFilter, SharedMessageBus};
pub use config::{AnalysisConfig, LayerPattern};
pub use conflict::{
    ArbiterConfig, Claim, Conflict, ConflictEvidence, ConflictResolution, ConflictResolver,
    ConflictType, Decision, ResolvedBy, detect_conflicts, merge_findings,
};
pub use debate::{Debate, DebateManager, DebateResolution, DebateStatus, SharedDebateManager};
pub use error::AgentError;
pub use finding::{AgentRole, CriticReview, DebtType, Finding, Severity, Span};
pub use message::{AgentMessage, MessageContent, MessageType, Recipient};
pub use plan::{EstimatedEffort, RemediationPlan, RemediationTask, synthesize_plan};
pub use voting::{VoteDecision, VoteStrategy, WeightTable, tally};
