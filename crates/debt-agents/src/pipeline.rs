//! The four-phase scan pipeline.
//!
//! discovery → debate → resolution → planning → complete, strictly in that
//! order. Fan-out happens inside a phase; a later phase never observes
//! state before the previous phase's barrier. Phases accumulate errors
//! instead of raising; only invariant violations and cancellation abort
//! the scan.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use adjudication::bus::{MessageBus, SharedMessageBus};
use adjudication::config::AnalysisConfig;
use adjudication::conflict::{
    ArbiterConfig, Conflict, ConflictResolution, ConflictResolver, Decision, detect_conflicts,
};
use adjudication::debate::{DebateConfig, DebateError, DebateManager, SharedDebateManager};
use adjudication::error::AgentError;
use adjudication::finding::{AgentRole, CriticReview, Finding};
use adjudication::identity;
use adjudication::plan::{RemediationPlan, synthesize_plan};
use adjudication::ports::llm::LlmTransport;
use adjudication::ports::repo::RepoSnapshot;
use adjudication::ports::store::{DebtOccurrence, FindingStore, TemporalRecorder};
use futures::StreamExt;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::metrics::{MetricsCollector, ScanMetrics};
use crate::roster::Roster;
use crate::runner::{CriticRunner, DiscoveryRunner};

/// Error type for a scan. Phases accumulate recoverable errors on the
/// outcome; these two abort the scan with no plan.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("pipeline invariant violated: {0}")]
    Invariant(String),

    #[error("scan cancelled")]
    Cancelled,
}

/// Top-level states of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    Discovery,
    Debate,
    Resolution,
    Planning,
    Complete,
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discovery => write!(f, "discovery"),
            Self::Debate => write!(f, "debate"),
            Self::Resolution => write!(f, "resolution"),
            Self::Planning => write!(f, "planning"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Transitions are linear; no backtracking.
fn is_legal_transition(from: ScanPhase, to: ScanPhase) -> bool {
    use ScanPhase::*;
    matches!(
        (from, to),
        (Discovery, Debate) | (Debate, Resolution) | (Resolution, Planning) | (Planning, Complete)
    )
}

/// One recorded phase transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: ScanPhase,
    pub to: ScanPhase,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Enforces the linear phase order and keeps the transition log.
struct PhaseMachine {
    current: ScanPhase,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl PhaseMachine {
    fn new() -> Self {
        Self {
            current: ScanPhase::Discovery,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    fn advance(&mut self, to: ScanPhase, reason: Option<&str>) -> Result<(), ScanError> {
        if !is_legal_transition(self.current, to) {
            return Err(ScanError::Invariant(format!(
                "illegal phase transition: {} -> {}",
                self.current, to
            )));
        }
        info!(from = %self.current, to = %to, "phase transition");
        self.transitions.push(TransitionRecord {
            from: self.current,
            to,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        });
        self.current = to;
        Ok(())
    }
}

/// What a scan is asked to cover.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Generated when not supplied.
    pub scan_id: Option<String>,
    pub repository_id: String,
}

/// A finding that did not survive, with the reason it fell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedFinding {
    pub finding: Finding,
    pub reason: String,
}

/// Everything a completed scan produced.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub scan_id: String,
    pub repository_id: String,
    pub validated: Vec<Finding>,
    pub rejected: Vec<RejectedFinding>,
    /// Findings synthesized by conflict merges (also present in
    /// `validated`).
    pub merged: Vec<Finding>,
    pub plan: RemediationPlan,
    pub errors: Vec<AgentError>,
    pub metrics: ScanMetrics,
    pub transitions: Vec<TransitionRecord>,
}

/// Owns all per-scan state and drives the phases.
pub struct ScanPipeline {
    roster: Roster,
    transport: Arc<dyn LlmTransport>,
    repo: Arc<dyn RepoSnapshot>,
    store: Arc<dyn FindingStore>,
    recorder: Arc<dyn TemporalRecorder>,
    config: Arc<AnalysisConfig>,
    bus: SharedMessageBus,
    debates: SharedDebateManager,
    resolver: ConflictResolver,
}

impl ScanPipeline {
    pub fn new(
        roster: Roster,
        transport: Arc<dyn LlmTransport>,
        repo: Arc<dyn RepoSnapshot>,
        store: Arc<dyn FindingStore>,
        recorder: Arc<dyn TemporalRecorder>,
        config: AnalysisConfig,
    ) -> Self {
        let debates = DebateManager::new(DebateConfig {
            max_rounds: config.max_debate_rounds,
            strategy: config.resolution_strategy,
            weights: config.agent_weights.clone(),
        })
        .shared();
        let resolver = if config.arbiter_enabled {
            let model = roster
                .get(AgentRole::Critic)
                .map(|s| s.model.clone())
                .unwrap_or_default();
            ConflictResolver::with_arbiter(ArbiterConfig {
                transport: transport.clone(),
                model,
                temperature: 0.0,
                max_tokens: 1024,
            })
        } else {
            ConflictResolver::new()
        };
        Self {
            roster,
            transport,
            repo,
            store,
            recorder,
            config: Arc::new(config),
            bus: MessageBus::new().shared(),
            debates,
            resolver,
        }
    }

    /// The bus carrying every agent message of this pipeline.
    pub fn bus(&self) -> SharedMessageBus {
        self.bus.clone()
    }

    /// The debate ledger, shared with the caller for inspection.
    pub fn debates(&self) -> SharedDebateManager {
        self.debates.clone()
    }

    /// Run one scan to completion. Cancellation discards partial state and
    /// emits no plan.
    pub async fn run(
        &self,
        request: ScanRequest,
        cancel: CancellationToken,
    ) -> Result<ScanOutcome, ScanError> {
        let scan_id = request
            .scan_id
            .clone()
            .unwrap_or_else(identity::next_id);
        let repo_id = request.repository_id.clone();
        info!(scan_id = %scan_id, repo_id = %repo_id, "scan starting");

        let mut machine = PhaseMachine::new();
        let mut metrics = MetricsCollector::new();
        let mut errors: Vec<AgentError> = Vec::new();

        // Phase 1 — discovery.
        metrics.enter_phase("discovery");
        let discovery = self.discover(&repo_id, &cancel, &mut errors).await;
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }
        let union = discovery.union;
        let origin = discovery.origin;
        for (role, count, calls) in &discovery.per_agent {
            metrics.record_agent(role.as_str(), *count, *calls);
        }

        // Phase 2 — debate.
        machine.advance(ScanPhase::Debate, Some("discovery settled"))?;
        metrics.enter_phase("debate");
        let reviews = self.debate(&union, &origin, &cancel, &mut metrics, &mut errors).await?;
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        // Phase 3 — resolution.
        machine.advance(ScanPhase::Resolution, Some("challenges raised"))?;
        metrics.enter_phase("resolution");
        let resolved = self
            .resolve(
                &scan_id,
                &repo_id,
                &union,
                &discovery.scanner,
                &discovery.architect,
                &reviews,
                &mut metrics,
            )
            .await?;
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        // Phase 4 — planning.
        machine.advance(ScanPhase::Planning, Some("findings categorized"))?;
        metrics.enter_phase("planning");
        let plan = self
            .plan(&scan_id, &repo_id, &resolved.validated, &mut errors)
            .await;

        machine.advance(ScanPhase::Complete, None)?;
        metrics.record_outcome(
            resolved.validated.len(),
            resolved.rejected.len(),
            resolved.merged.len(),
        );
        metrics.record_errors(errors.len());
        info!(
            scan_id = %scan_id,
            validated = resolved.validated.len(),
            rejected = resolved.rejected.len(),
            tasks = plan.prioritized_tasks.len(),
            "scan complete"
        );

        Ok(ScanOutcome {
            scan_id,
            repository_id: repo_id,
            validated: resolved.validated,
            rejected: resolved.rejected,
            merged: resolved.merged,
            plan,
            errors,
            metrics: metrics.finalize(),
            transitions: machine.transitions,
        })
    }

    async fn discover(
        &self,
        repo_id: &str,
        cancel: &CancellationToken,
        errors: &mut Vec<AgentError>,
    ) -> DiscoveryResult {
        let mut result = DiscoveryResult::default();

        let mut roles = vec![AgentRole::Scanner, AgentRole::Architect];
        if self.config.historian_enabled {
            roles.push(AgentRole::Historian);
        }
        let runners: Vec<(AgentRole, DiscoveryRunner)> = roles
            .into_iter()
            .filter_map(|role| {
                let Some(spec) = self.roster.get(role) else {
                    warn!(role = %role, "no roster row, skipping agent");
                    return None;
                };
                Some((
                    role,
                    DiscoveryRunner::new(
                        spec.clone(),
                        self.transport.clone(),
                        self.repo.clone(),
                        self.config.clone(),
                        self.bus.clone(),
                    ),
                ))
            })
            .collect();

        let files = match self.repo.list_files(repo_id).await {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, "repository listing failed; discovery is empty");
                for (role, _) in &runners {
                    errors.push(AgentError::fatal(
                        *role,
                        format!("repository listing failed: {e}"),
                    ));
                }
                return result;
            }
        };

        // Fan-out; advance on all-settled, never on all-succeeded.
        let outcomes = join_all(
            runners
                .iter()
                .map(|(_, runner)| runner.run(repo_id, &files, cancel)),
        )
        .await;

        for outcome in outcomes {
            result
                .per_agent
                .push((outcome.role, outcome.findings.len(), outcome.llm_calls));
            errors.extend(outcome.errors);
            for finding in outcome.findings {
                result.origin.insert(finding.id.clone(), outcome.role);
                match outcome.role {
                    AgentRole::Scanner => result.scanner.push(finding.clone()),
                    AgentRole::Architect => result.architect.push(finding.clone()),
                    _ => {}
                }
                result.union.push(finding);
            }
        }
        result
    }

    async fn debate(
        &self,
        union: &[Finding],
        origin: &HashMap<String, AgentRole>,
        cancel: &CancellationToken,
        metrics: &mut MetricsCollector,
        errors: &mut Vec<AgentError>,
    ) -> Result<HashMap<String, CriticReview>, ScanError> {
        let Some(spec) = self.roster.get(AgentRole::Critic) else {
            warn!("no critic in the roster; findings pass unreviewed");
            return Ok(HashMap::new());
        };
        let critic = CriticRunner::new(
            spec.clone(),
            self.transport.clone(),
            self.config.clone(),
            self.bus.clone(),
        );
        let outcome = critic.run(union, cancel).await;
        metrics.record_agent(AgentRole::Critic.as_str(), 0, outcome.llm_calls);
        errors.extend(outcome.errors);

        for (finding, reason, evidence) in outcome.challenges {
            let initiator = origin
                .get(&finding.id)
                .copied()
                .unwrap_or(AgentRole::Scanner);
            self.debates
                .start_debate(finding, initiator, AgentRole::Critic, reason, evidence)
                .map_err(|e| ScanError::Invariant(e.to_string()))?;
        }
        metrics.record_debates(self.debates.all_debates().len());
        Ok(outcome.reviews)
    }

    #[allow(clippy::too_many_arguments)]
    async fn resolve(
        &self,
        _scan_id: &str,
        repo_id: &str,
        union: &[Finding],
        scanner: &[Finding],
        architect: &[Finding],
        reviews: &HashMap<String, CriticReview>,
        metrics: &mut MetricsCollector,
    ) -> Result<ResolvedFindings, ScanError> {
        // Settle every still-active debate. Short exchanges resolve through
        // the internal strategy; longer ones go to the arbiter when one is
        // configured.
        for debate in self.debates.active_debates() {
            if debate.messages.len() > 2 && self.resolver.has_arbiter() {
                if let Some(resolution) = self.resolver.arbitrate_debate(&debate).await {
                    self.debates
                        .resolve_with(&debate.id, resolution)
                        .map_err(|e: DebateError| ScanError::Invariant(e.to_string()))?;
                    continue;
                }
            }
            self.debates
                .resolve_debate(&debate.id)
                .map_err(|e| ScanError::Invariant(e.to_string()))?;
        }

        // Conflicts between the two discovery streams, resolved on the
        // bounded worker pool.
        let conflicts = detect_conflicts(scanner, architect);
        metrics.record_conflicts(conflicts.len());
        let resolutions: Vec<ConflictResolution> = futures::stream::iter(conflicts.iter())
            .map(|conflict| self.resolver.resolve(conflict))
            .buffered(self.config.worker_pool_size.max(1))
            .collect()
            .await;

        let mut resolved = self.categorize(union, reviews);
        self.apply_conflict_resolutions(repo_id, &conflicts, &resolutions, &mut resolved)
            .await;
        Ok(resolved)
    }

    /// Debate verdict beats critic review beats default-accept.
    fn categorize(
        &self,
        union: &[Finding],
        reviews: &HashMap<String, CriticReview>,
    ) -> ResolvedFindings {
        let mut resolved = ResolvedFindings::default();
        for finding in union {
            if let Some(debate) = self.debates.debate_for_finding(&finding.id) {
                if let Some(resolution) = debate.resolution {
                    if resolution.accepted {
                        let mut survivor = finding.with_confidence(resolution.final_confidence);
                        if let Some(severity) = resolution.adjusted_severity {
                            survivor = survivor.with_severity(severity);
                        }
                        resolved.validated.push(survivor);
                    } else {
                        resolved.rejected.push(RejectedFinding {
                            finding: finding.clone(),
                            reason: resolution.reason,
                        });
                    }
                    continue;
                }
            }
            if let Some(review) = reviews.get(&finding.id) {
                if review.accepted {
                    resolved
                        .validated
                        .push(finding.with_confidence(review.confidence));
                } else {
                    resolved.rejected.push(RejectedFinding {
                        finding: finding.clone(),
                        reason: review.reason.clone(),
                    });
                }
                continue;
            }
            resolved.validated.push(finding.clone());
        }

        // The configured floor applies to whatever survived.
        let threshold = self.config.confidence_threshold;
        let mut kept = Vec::with_capacity(resolved.validated.len());
        for finding in resolved.validated.drain(..) {
            if finding.confidence < threshold {
                resolved.rejected.push(RejectedFinding {
                    reason: format!(
                        "confidence {:.2} below configured threshold {:.2}",
                        finding.confidence, threshold
                    ),
                    finding,
                });
            } else {
                kept.push(finding);
            }
        }
        resolved.validated = kept;
        resolved
    }

    /// Winners replace claimants; losers of accept decisions are rejected;
    /// merge claimants dissolve into the synthesized finding.
    async fn apply_conflict_resolutions(
        &self,
        repo_id: &str,
        conflicts: &[Conflict],
        resolutions: &[ConflictResolution],
        resolved: &mut ResolvedFindings,
    ) {
        for (conflict, resolution) in conflicts.iter().zip(resolutions) {
            let claim_ids: Vec<&str> = conflict
                .claims
                .iter()
                .map(|c| c.finding.id.as_str())
                .collect();
            let winner_id = resolution
                .resulting_finding
                .as_ref()
                .map(|f| f.id.as_str());

            let mut removed: Vec<Finding> = Vec::new();
            resolved.validated.retain(|f| {
                if claim_ids.contains(&f.id.as_str()) {
                    removed.push(f.clone());
                    false
                } else {
                    true
                }
            });
            if removed.is_empty() {
                // Every claimant already fell in debate; nothing to replace.
                continue;
            }

            for finding in removed {
                let is_winner = Some(finding.id.as_str()) == winner_id;
                if !is_winner && resolution.decision != Decision::Merge {
                    resolved.rejected.push(RejectedFinding {
                        finding,
                        reason: resolution.reasoning.clone(),
                    });
                }
            }

            if let Some(result) = &resolution.resulting_finding {
                let mut result = result.clone();
                if resolution.decision == Decision::Merge {
                    self.refresh_fingerprint(repo_id, &mut result).await;
                    resolved.merged.push(result.clone());
                }
                resolved.validated.push(result);
            }
        }
    }

    /// Recompute a merged finding's fingerprint from the merged span once
    /// file content is reachable. Best effort; the title-based fallback
    /// already in place stands on failure.
    async fn refresh_fingerprint(&self, repo_id: &str, finding: &mut Finding) {
        let Some(span) = finding.span else { return };
        match self.repo.file_content(repo_id, &finding.file_path).await {
            Ok(content) => {
                let text = identity::span_text(&content, span);
                finding.fingerprint = identity::fingerprint(
                    finding.debt_type,
                    &finding.file_path,
                    Some(&text),
                    &finding.title,
                );
            }
            Err(e) => warn!(
                file = %finding.file_path,
                error = %e,
                "could not refresh merged fingerprint"
            ),
        }
    }

    async fn plan(
        &self,
        scan_id: &str,
        repo_id: &str,
        validated: &[Finding],
        errors: &mut Vec<AgentError>,
    ) -> RemediationPlan {
        // Record every surviving finding for temporal tracking.
        for finding in validated {
            let occurrence = DebtOccurrence {
                fingerprint: finding.fingerprint.clone(),
                scan_id: scan_id.to_string(),
                repository_id: repo_id.to_string(),
                file_path: finding.file_path.clone(),
                severity: finding.severity,
                confidence: finding.confidence,
                is_resolved: false,
            };
            if let Err(e) = self.recorder.record(occurrence).await {
                errors.push(AgentError::recoverable(
                    AgentRole::Planner,
                    Some(finding.id.clone()),
                    format!("temporal recording failed: {e}"),
                ));
            }
        }

        let plan = synthesize_plan(scan_id, validated);

        for finding in validated {
            if let Err(e) = self.store.upsert_finding(finding).await {
                errors.push(AgentError::recoverable(
                    AgentRole::Planner,
                    Some(finding.id.clone()),
                    format!("finding persistence failed: {e}"),
                ));
            }
        }
        if let Err(e) = self.store.insert_plan(scan_id, &plan).await {
            errors.push(AgentError::recoverable(
                AgentRole::Planner,
                None,
                format!("plan persistence failed: {e}"),
            ));
        }
        plan
    }
}

#[derive(Default)]
struct DiscoveryResult {
    union: Vec<Finding>,
    scanner: Vec<Finding>,
    architect: Vec<Finding>,
    origin: HashMap<String, AgentRole>,
    per_agent: Vec<(AgentRole, usize, u32)>,
}

#[derive(Default)]
struct ResolvedFindings {
    validated: Vec<Finding>,
    rejected: Vec<RejectedFinding>,
    merged: Vec<Finding>,
}
