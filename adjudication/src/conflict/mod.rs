//! Structural disagreement between discovery agents.
//!
//! The detector surfaces conflicts from overlapping claims; the resolver
//! reduces each conflict to a decision, optionally consulting an LLM
//! arbiter. Conflicts are values: created once, never mutated.

mod detect;
mod resolve;

pub use detect::{detect_between, detect_conflicts};
pub use resolve::{ArbiterConfig, ArbiterVerdict, ConflictResolver, DebateVerdict, merge_findings};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::finding::{AgentRole, Finding};

/// Kind of structural disagreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    ContradictoryFindings,
    SeverityDisagreement,
    ClassificationDispute,
    ScopeDisagreement,
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ContradictoryFindings => write!(f, "contradictory_findings"),
            Self::SeverityDisagreement => write!(f, "severity_disagreement"),
            Self::ClassificationDispute => write!(f, "classification_dispute"),
            Self::ScopeDisagreement => write!(f, "scope_disagreement"),
        }
    }
}

/// One agent's side of a conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub agent: AgentRole,
    pub finding: Finding,
    pub rationale: String,
    pub confidence: f64,
}

/// A piece of evidence weighing on one side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictEvidence {
    pub agent: AgentRole,
    pub kind: String,
    pub content: String,
    /// Which party this evidence supports.
    pub supports: AgentRole,
    pub weight: f64,
}

/// A detected disagreement between two claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub id: String,
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    pub parties: BTreeSet<AgentRole>,
    pub claims: Vec<Claim>,
    pub evidence: Vec<ConflictEvidence>,
}

impl Conflict {
    /// The two findings under dispute, in claim order.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.claims.iter().map(|c| &c.finding)
    }
}

/// How a conflict was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    AcceptFirst,
    AcceptSecond,
    Merge,
    RejectBoth,
}

/// Which mechanism produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedBy {
    Vote,
    Arbiter,
    Evidence,
}

/// The resolver's answer for one conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictResolution {
    pub conflict_id: String,
    pub decision: Decision,
    pub reasoning: String,
    /// The finding that survives: the winning claim's finding for
    /// accept decisions, a synthesized finding for merges, none when
    /// both claims are rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resulting_finding: Option<Finding>,
    pub resolved_by: ResolvedBy,
}
