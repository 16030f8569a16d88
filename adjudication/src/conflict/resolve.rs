//! Conflict resolution: evidence scoring with an optional LLM arbiter.
//!
//! The evidence path is the default and always available. When an arbiter
//! is configured the conflict is serialized to the LLM with a neutral
//! prompt; any transport or parse failure falls back to the evidence path.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::debate::{Debate, DebateResolution};
use crate::finding::{Finding, Severity, Span};
use crate::identity;
use crate::ports::llm::{ChatMessage, CompletionRequest, LlmTransport};

use super::{Conflict, ConflictResolution, Decision, ResolvedBy};

/// Structured verdict the arbiter must produce for a conflict.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ArbiterVerdict {
    pub decision: Decision,
    pub reasoning: String,
}

/// Structured verdict the arbiter must produce for a stalled debate.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DebateVerdict {
    pub accepted: bool,
    /// Confidence the finding should carry if accepted.
    pub confidence: f64,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjusted_severity: Option<Severity>,
}

const ARBITER_SYSTEM_PROMPT: &str = "You are a neutral arbiter for a technical-debt \
analysis pipeline. Two analysis agents disagree. Weigh the claims and evidence on \
their merits only; do not favor either agent. Answer with the requested JSON shape \
and nothing else.";

const DEBATE_ARBITER_SYSTEM_PROMPT: &str = "You are a neutral arbiter for a \
technical-debt analysis pipeline. A finding was challenged and the debate did not \
converge. Read the exchange and decide whether the finding stands. Answer with the \
requested JSON shape and nothing else.";

/// Configuration for the arbiter path.
#[derive(Clone)]
pub struct ArbiterConfig {
    pub transport: Arc<dyn LlmTransport>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Reduces conflicts to resolutions.
#[derive(Default)]
pub struct ConflictResolver {
    arbiter: Option<ArbiterConfig>,
}

impl ConflictResolver {
    /// Evidence-only resolver.
    pub fn new() -> Self {
        Self { arbiter: None }
    }

    /// Resolver that consults the LLM arbiter first.
    pub fn with_arbiter(arbiter: ArbiterConfig) -> Self {
        Self {
            arbiter: Some(arbiter),
        }
    }

    pub fn has_arbiter(&self) -> bool {
        self.arbiter.is_some()
    }

    /// Resolve one conflict.
    pub async fn resolve(&self, conflict: &Conflict) -> ConflictResolution {
        if let Some(arbiter) = &self.arbiter {
            match self.arbitrate(arbiter, conflict).await {
                Ok(resolution) => return resolution,
                Err(reason) => {
                    warn!(
                        conflict_id = %conflict.id,
                        reason,
                        "arbiter unavailable, falling back to evidence scoring"
                    );
                }
            }
        }
        resolve_by_evidence(conflict)
    }

    /// Decide a stalled debate through the arbiter. Returns `None` when no
    /// arbiter is configured or the call fails; the caller then resolves
    /// through the internal voting strategy.
    pub async fn arbitrate_debate(&self, debate: &Debate) -> Option<DebateResolution> {
        let arbiter = self.arbiter.as_ref()?;
        let transcript = serde_json::to_string_pretty(&debate.messages).ok()?;
        let finding = serde_json::to_string_pretty(&debate.topic).ok()?;
        let request = CompletionRequest {
            model: arbiter.model.clone(),
            system_prompt: DEBATE_ARBITER_SYSTEM_PROMPT.to_string(),
            messages: vec![ChatMessage::user(format!(
                "Finding under debate:\n{finding}\n\nExchange:\n{transcript}"
            ))],
            temperature: arbiter.temperature,
            max_tokens: arbiter.max_tokens,
            tools: vec![],
        };
        let schema = serde_json::to_value(schemars::schema_for!(DebateVerdict)).ok()?;
        let value = match arbiter.transport.complete_structured(request, schema).await {
            Ok(value) => value,
            Err(e) => {
                warn!(debate_id = %debate.id, error = %e, "debate arbitration failed");
                return None;
            }
        };
        let verdict: DebateVerdict = match serde_json::from_value(value) {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(debate_id = %debate.id, error = %e, "unparseable debate verdict");
                return None;
            }
        };
        let mut resolution = if verdict.accepted {
            DebateResolution::accepted(verdict.reason, Default::default(), verdict.confidence)
        } else {
            DebateResolution::rejected(verdict.reason, Default::default())
        };
        if let Some(severity) = verdict.adjusted_severity {
            resolution = resolution.with_adjusted_severity(severity);
        }
        Some(resolution)
    }

    async fn arbitrate(
        &self,
        arbiter: &ArbiterConfig,
        conflict: &Conflict,
    ) -> Result<ConflictResolution, String> {
        let serialized =
            serde_json::to_string_pretty(conflict).map_err(|e| e.to_string())?;
        let request = CompletionRequest {
            model: arbiter.model.clone(),
            system_prompt: ARBITER_SYSTEM_PROMPT.to_string(),
            messages: vec![ChatMessage::user(format!(
                "Resolve this conflict:\n{serialized}"
            ))],
            temperature: arbiter.temperature,
            max_tokens: arbiter.max_tokens,
            tools: vec![],
        };
        let schema =
            serde_json::to_value(schemars::schema_for!(ArbiterVerdict)).map_err(|e| e.to_string())?;
        let value = arbiter
            .transport
            .complete_structured(request, schema)
            .await
            .map_err(|e| e.to_string())?;
        let verdict: ArbiterVerdict =
            serde_json::from_value(value).map_err(|e| e.to_string())?;

        let resulting_finding = match verdict.decision {
            Decision::AcceptFirst => conflict.claims.first().map(|c| c.finding.clone()),
            Decision::AcceptSecond => conflict.claims.get(1).map(|c| c.finding.clone()),
            Decision::Merge => {
                let mut findings = conflict.findings();
                match (findings.next(), findings.next()) {
                    (Some(a), Some(b)) => Some(merge_findings(a, b)),
                    _ => return Err("merge verdict on a one-claim conflict".into()),
                }
            }
            Decision::RejectBoth => None,
        };

        debug!(
            conflict_id = %conflict.id,
            decision = ?verdict.decision,
            "conflict arbitrated"
        );
        Ok(ConflictResolution {
            conflict_id: conflict.id.clone(),
            decision: verdict.decision,
            reasoning: verdict.reasoning,
            resulting_finding,
            resolved_by: ResolvedBy::Arbiter,
        })
    }
}

/// Default path: each side scores its claim confidence plus the weight of
/// the evidence supporting it; the higher total wins. Ties go to the first
/// claim.
fn resolve_by_evidence(conflict: &Conflict) -> ConflictResolution {
    if conflict.claims.len() < 2 {
        return ConflictResolution {
            conflict_id: conflict.id.clone(),
            decision: Decision::AcceptFirst,
            reasoning: "single-claim conflict; nothing to weigh".into(),
            resulting_finding: conflict.claims.first().map(|c| c.finding.clone()),
            resolved_by: ResolvedBy::Evidence,
        };
    }
    let score_for = |index: usize| -> f64 {
        let claim = &conflict.claims[index];
        let evidence_weight: f64 = conflict
            .evidence
            .iter()
            .filter(|e| e.supports == claim.agent)
            .map(|e| e.weight)
            .sum();
        claim.confidence + evidence_weight
    };

    let first_score = score_for(0);
    let second_score = score_for(1);
    let (decision, winner) = if second_score > first_score {
        (Decision::AcceptSecond, &conflict.claims[1])
    } else {
        (Decision::AcceptFirst, &conflict.claims[0])
    };

    ConflictResolution {
        conflict_id: conflict.id.clone(),
        decision,
        reasoning: format!(
            "evidence totals: {} {:.2} vs {} {:.2}; accepting {}",
            conflict.claims[0].agent,
            first_score,
            conflict.claims[1].agent,
            second_score,
            winner.agent
        ),
        resulting_finding: Some(winner.finding.clone()),
        resolved_by: ResolvedBy::Evidence,
    }
}

/// Merge two overlapping findings into one.
///
/// The higher-confidence finding (ties broken by lexicographic id) leads:
/// its debt type, file and title win; severity is the max of both;
/// confidence the mean; the span the envelope of the defined bounds.
/// The fingerprint is recomputed by the caller once span text is available.
pub fn merge_findings(a: &Finding, b: &Finding) -> Finding {
    let (f1, f2) = if a.confidence > b.confidence
        || (a.confidence == b.confidence && a.id <= b.id)
    {
        (a, b)
    } else {
        (b, a)
    };

    let span = match (f1.span, f2.span) {
        (Some(s1), Some(s2)) => Span::new(s1.start.min(s2.start), s1.end.max(s2.end)),
        (Some(s), None) | (None, Some(s)) => Some(s),
        (None, None) => None,
    };

    let mut evidence: Vec<String> = Vec::new();
    for item in f1.evidence.iter().chain(f2.evidence.iter()) {
        if !evidence.contains(item) {
            evidence.push(item.clone());
        }
    }

    let suggested_fix = [&f1.suggested_fix, &f2.suggested_fix]
        .into_iter()
        .flatten()
        .find(|fix| !fix.is_empty())
        .cloned();

    let lead: String = f2.description.chars().take(50).collect();
    let description = if f1.description.contains(&lead) {
        f1.description.clone()
    } else {
        format!("{}\n\nAdditional context: {}", f1.description, f2.description)
    };

    Finding {
        id: identity::next_id(),
        debt_type: f1.debt_type,
        severity: f1.severity.max(f2.severity),
        confidence: (f1.confidence + f2.confidence) / 2.0,
        title: f1.title.clone(),
        description,
        file_path: f1.file_path.clone(),
        span,
        evidence,
        suggested_fix,
        fingerprint: identity::fingerprint(f1.debt_type, &f1.file_path, None, &f1.title),
    }
}
