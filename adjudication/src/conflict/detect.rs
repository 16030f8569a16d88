//! Conflict detection over two discovery streams.
//!
//! Every same-file pair is examined; cross-file comparison is not. The
//! rules run in order and a pair yields at most one conflict, so detection
//! is symmetric in its inputs up to claim order.

use std::collections::BTreeSet;

use tracing::debug;

use crate::finding::{AgentRole, DebtType, Finding};
use crate::identity;

use super::{Claim, Conflict, ConflictEvidence, ConflictType};

/// Debt-type pairs that cannot both be true of the same code.
const EXCLUSIVE_PAIRS: [(DebtType, DebtType); 2] = [
    (DebtType::DeadCode, DebtType::MissingTests),
    (DebtType::GodClass, DebtType::FeatureEnvy),
];

/// Severity gap (in ranks) that counts as a disagreement.
const SEVERITY_GAP: u8 = 2;

/// Weight carried by each evidence string a claimant brings.
const EVIDENCE_ITEM_WEIGHT: f64 = 0.1;

/// Compare the Scanner and Architect streams pairwise and emit conflicts.
pub fn detect_conflicts(scanner: &[Finding], architect: &[Finding]) -> Vec<Conflict> {
    detect_between(
        (AgentRole::Scanner, scanner),
        (AgentRole::Architect, architect),
    )
}

/// Generic pairwise detection between two named streams.
pub fn detect_between(
    (first_agent, first): (AgentRole, &[Finding]),
    (second_agent, second): (AgentRole, &[Finding]),
) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for a in first {
        for b in second {
            if a.file_path != b.file_path {
                continue;
            }
            if let Some(conflict_type) = classify_pair(a, b) {
                conflicts.push(build_conflict(
                    conflict_type,
                    (first_agent, a),
                    (second_agent, b),
                ));
            }
        }
    }
    debug!(count = conflicts.len(), "conflict detection complete");
    conflicts
}

/// Apply the detection rules in order; the first match wins.
fn classify_pair(a: &Finding, b: &Finding) -> Option<ConflictType> {
    let overlapping = spans_overlap(a, b);

    if overlapping && a.debt_type != b.debt_type && is_exclusive_pair(a.debt_type, b.debt_type) {
        return Some(ConflictType::ClassificationDispute);
    }

    if overlapping
        && a.debt_type == b.debt_type
        && a.severity.rank().abs_diff(b.severity.rank()) >= SEVERITY_GAP
    {
        return Some(ConflictType::SeverityDisagreement);
    }

    if a.debt_type == b.debt_type {
        if let (Some(sa), Some(sb)) = (a.span, b.span) {
            let (small, large) = if sa.len() <= sb.len() {
                (sa.len(), sb.len())
            } else {
                (sb.len(), sa.len())
            };
            if large > small * 2 {
                return Some(ConflictType::ScopeDisagreement);
            }
        }
    }

    None
}

/// Missing bounds are treated as overlapping.
fn spans_overlap(a: &Finding, b: &Finding) -> bool {
    match (a.span, b.span) {
        (Some(sa), Some(sb)) => sa.overlaps(sb),
        _ => true,
    }
}

fn is_exclusive_pair(a: DebtType, b: DebtType) -> bool {
    EXCLUSIVE_PAIRS
        .iter()
        .any(|(x, y)| (a == *x && b == *y) || (a == *y && b == *x))
}

fn build_conflict(
    conflict_type: ConflictType,
    (first_agent, a): (AgentRole, &Finding),
    (second_agent, b): (AgentRole, &Finding),
) -> Conflict {
    let claim = |agent: AgentRole, finding: &Finding| Claim {
        agent,
        finding: finding.clone(),
        rationale: describe_claim(finding),
        confidence: finding.confidence,
    };
    let evidence_for = |agent: AgentRole, finding: &Finding| {
        finding
            .evidence
            .iter()
            .map(|content| ConflictEvidence {
                agent,
                kind: "finding_evidence".into(),
                content: content.clone(),
                supports: agent,
                weight: EVIDENCE_ITEM_WEIGHT,
            })
            .collect::<Vec<_>>()
    };

    let mut evidence = evidence_for(first_agent, a);
    evidence.extend(evidence_for(second_agent, b));

    Conflict {
        id: identity::next_id(),
        conflict_type,
        parties: BTreeSet::from([first_agent, second_agent]),
        claims: vec![claim(first_agent, a), claim(second_agent, b)],
        evidence,
    }
}

fn describe_claim(finding: &Finding) -> String {
    match finding.span {
        Some(span) => format!(
            "{} {} at {}:{}",
            finding.severity, finding.debt_type, finding.file_path, span
        ),
        None => format!(
            "{} {} in {}",
            finding.severity, finding.debt_type, finding.file_path
        ),
    }
}
