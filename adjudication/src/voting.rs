//! Weighted voting over per-debt-type weight rows.
//!
//! Each debt type has a row of per-role weights; a `default` row covers
//! unlisted types. Agents missing from a row contribute ±0.1 under the
//! weighted strategy.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::finding::{AgentRole, DebtType};

/// Weight applied for agents absent from the relevant row.
const UNKNOWN_AGENT_WEIGHT: f64 = 0.1;

/// How recorded votes are combined into a decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteStrategy {
    /// More yes than no.
    Majority,
    /// Signed weight sum must be positive.
    #[default]
    Weighted,
    /// The critic's vote decides; falls back to majority without one.
    Conservative,
    /// Every recorded vote must be yes.
    Unanimous,
}

impl std::fmt::Display for VoteStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Majority => write!(f, "majority"),
            Self::Weighted => write!(f, "weighted"),
            Self::Conservative => write!(f, "conservative"),
            Self::Unanimous => write!(f, "unanimous"),
        }
    }
}

/// Per-debt-type vote weights. Rows sum to at most 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightTable {
    #[serde(default)]
    rows: HashMap<DebtType, HashMap<AgentRole, f64>>,
    default_row: HashMap<AgentRole, f64>,
}

impl WeightTable {
    pub fn new(
        rows: HashMap<DebtType, HashMap<AgentRole, f64>>,
        default_row: HashMap<AgentRole, f64>,
    ) -> Self {
        Self { rows, default_row }
    }

    /// Weight of `role` when voting on `debt_type`.
    pub fn weight_for(&self, debt_type: DebtType, role: AgentRole) -> f64 {
        let row = self.rows.get(&debt_type).unwrap_or(&self.default_row);
        row.get(&role).copied().unwrap_or(UNKNOWN_AGENT_WEIGHT)
    }
}

impl Default for WeightTable {
    /// The shipped table. Unlisted debt types use the `default` row.
    fn default() -> Self {
        use AgentRole::*;
        let row = |s: f64, a: f64, h: f64, c: f64, p: f64| {
            HashMap::from([(Scanner, s), (Architect, a), (Historian, h), (Critic, c), (Planner, p)])
        };
        let mut rows = HashMap::new();
        rows.insert(DebtType::CodeSmell, row(0.4, 0.2, 0.1, 0.2, 0.1));
        rows.insert(DebtType::CircularDependency, row(0.1, 0.5, 0.1, 0.2, 0.1));
        rows.insert(DebtType::SecurityIssue, row(0.3, 0.2, 0.1, 0.3, 0.1));
        Self {
            rows,
            default_row: row(0.25, 0.25, 0.2, 0.2, 0.1),
        }
    }
}

/// Outcome of a tally.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteDecision {
    pub accepted: bool,
    /// Signed score under the weighted strategy; yes−no otherwise.
    pub score: f64,
    pub yes: usize,
    pub no: usize,
}

/// Combine recorded votes under `strategy` for a finding of `debt_type`.
///
/// Empty vote sets reject under majority and unanimous; conservative with
/// no critic vote falls back to majority.
pub fn tally(
    votes: &BTreeMap<AgentRole, bool>,
    strategy: VoteStrategy,
    debt_type: DebtType,
    weights: &WeightTable,
) -> VoteDecision {
    let yes = votes.values().filter(|v| **v).count();
    let no = votes.len() - yes;

    let decision = match strategy {
        VoteStrategy::Majority => VoteDecision {
            accepted: yes > no,
            score: yes as f64 - no as f64,
            yes,
            no,
        },
        VoteStrategy::Weighted => {
            let score: f64 = votes
                .iter()
                .map(|(role, vote)| {
                    let weight = weights.weight_for(debt_type, *role);
                    if *vote {
                        weight
                    } else {
                        -weight
                    }
                })
                .sum();
            VoteDecision {
                accepted: score > 0.0,
                score,
                yes,
                no,
            }
        }
        VoteStrategy::Conservative => match votes.get(&AgentRole::Critic) {
            Some(critic_vote) => VoteDecision {
                accepted: *critic_vote,
                score: if *critic_vote { 1.0 } else { -1.0 },
                yes,
                no,
            },
            None => tally(votes, VoteStrategy::Majority, debt_type, weights),
        },
        VoteStrategy::Unanimous => VoteDecision {
            accepted: !votes.is_empty() && no == 0,
            score: yes as f64 - no as f64,
            yes,
            no,
        },
    };

    debug!(
        strategy = %strategy,
        debt_type = %debt_type,
        yes,
        no,
        score = decision.score,
        accepted = decision.accepted,
        "tallied votes"
    );
    decision
}
