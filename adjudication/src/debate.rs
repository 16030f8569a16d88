//! Bounded debate protocol.
//!
//! A debate is finite state operated on by one task at a time, not a
//! long-lived actor. The manager owns every debate until resolution;
//! once a debate leaves `Active` its message list is frozen.
//!
//! Termination: a concede or consensus message, or the round limit
//! (`floor(messages/2) >= max_rounds`). Wall-clock timeout is enforced by
//! the caller; the manager only exposes elapsed state.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::finding::{AgentRole, Finding, Severity};
use crate::message::{AgentMessage, MessageType, Recipient};
use crate::voting::{self, VoteStrategy, WeightTable};

/// Error type for debate operations.
#[derive(Debug, thiserror::Error)]
pub enum DebateError {
    #[error("finding {0} is already the topic of an active debate")]
    AlreadyDebated(String),

    #[error("debate not found: {0}")]
    NotFound(String),

    #[error("debate {0} is no longer active; messages are frozen")]
    Frozen(String),
}

/// Result type for debate operations.
pub type DebateResult<T> = Result<T, DebateError>;

/// Shared reference to the manager.
pub type SharedDebateManager = Arc<DebateManager>;

/// Lifecycle of a debate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebateStatus {
    Active,
    Resolved,
    Escalated,
}

impl std::fmt::Display for DebateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Resolved => write!(f, "resolved"),
            Self::Escalated => write!(f, "escalated"),
        }
    }
}

/// Verdict attached to a resolved debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateResolution {
    pub accepted: bool,
    pub reason: String,
    pub votes: BTreeMap<AgentRole, bool>,
    /// Confidence the finding carries forward; 0 when rejected.
    pub final_confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjusted_severity: Option<Severity>,
}

impl DebateResolution {
    pub fn accepted(
        reason: impl Into<String>,
        votes: BTreeMap<AgentRole, bool>,
        final_confidence: f64,
    ) -> Self {
        Self {
            accepted: true,
            reason: reason.into(),
            votes,
            final_confidence: final_confidence.clamp(0.0, 1.0),
            adjusted_severity: None,
        }
    }

    /// A rejection always carries zero confidence.
    pub fn rejected(reason: impl Into<String>, votes: BTreeMap<AgentRole, bool>) -> Self {
        Self {
            accepted: false,
            reason: reason.into(),
            votes,
            final_confidence: 0.0,
            adjusted_severity: None,
        }
    }

    pub fn with_adjusted_severity(mut self, severity: Severity) -> Self {
        self.adjusted_severity = Some(severity);
        self
    }
}

/// A bounded exchange about one finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debate {
    pub id: String,
    /// Snapshot of the finding at debate start.
    pub topic: Finding,
    /// Agent that produced the finding.
    pub initiator: AgentRole,
    /// Agent that issued the first challenge.
    pub challenger: AgentRole,
    pub messages: Vec<AgentMessage>,
    pub status: DebateStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<DebateResolution>,
}

impl Debate {
    /// Completed rounds: one round is a challenge/response pair.
    pub fn rounds(&self) -> u32 {
        (self.messages.len() / 2) as u32
    }

    pub fn first_message_of(&self, msg_type: MessageType) -> Option<&AgentMessage> {
        self.messages.iter().find(|m| m.msg_type == msg_type)
    }

    /// Whether `timeout_ms` has elapsed since the debate started.
    pub fn is_timed_out(&self, timeout_ms: u64, now: DateTime<Utc>) -> bool {
        now - self.started_at >= Duration::milliseconds(timeout_ms as i64)
    }

    /// Latest vote per agent, in role order.
    fn recorded_votes(&self) -> BTreeMap<AgentRole, bool> {
        let mut votes = BTreeMap::new();
        for msg in &self.messages {
            if msg.msg_type == MessageType::Vote {
                if let Some(vote) = msg.content.vote {
                    votes.insert(msg.from, vote);
                }
            }
        }
        votes
    }
}

/// Tuning for debate resolution.
#[derive(Debug, Clone)]
pub struct DebateConfig {
    pub max_rounds: u32,
    pub strategy: VoteStrategy,
    pub weights: WeightTable,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            strategy: VoteStrategy::default(),
            weights: WeightTable::default(),
        }
    }
}

#[derive(Default)]
struct ManagerState {
    debates: HashMap<String, Debate>,
    /// Finding id → debate id of the most recent debate on that topic.
    by_topic: HashMap<String, String>,
}

/// Owns every debate from challenge to resolution.
pub struct DebateManager {
    state: Mutex<ManagerState>,
    config: DebateConfig,
}

impl DebateManager {
    pub fn new(config: DebateConfig) -> Self {
        Self {
            state: Mutex::new(ManagerState::default()),
            config,
        }
    }

    pub fn shared(self) -> SharedDebateManager {
        Arc::new(self)
    }

    /// Open a debate with the initial challenge already appended.
    pub fn start_debate(
        &self,
        finding: Finding,
        initiator: AgentRole,
        challenger: AgentRole,
        reason: impl Into<String>,
        evidence: Vec<String>,
    ) -> DebateResult<Debate> {
        let mut state = self.state.lock().expect("debate lock poisoned");
        if let Some(existing_id) = state.by_topic.get(&finding.id) {
            if let Some(existing) = state.debates.get(existing_id) {
                if existing.status == DebateStatus::Active {
                    return Err(DebateError::AlreadyDebated(finding.id.clone()));
                }
            }
        }

        let challenge = AgentMessage::challenge(
            challenger,
            Recipient::Role(initiator),
            finding.clone(),
            reason,
            evidence,
        );
        let debate = Debate {
            id: crate::identity::next_id(),
            topic: finding,
            initiator,
            challenger,
            messages: vec![challenge],
            status: DebateStatus::Active,
            started_at: Utc::now(),
            resolved_at: None,
            resolution: None,
        };
        info!(
            debate_id = %debate.id,
            finding_id = %debate.topic.id,
            initiator = %initiator,
            challenger = %challenger,
            "debate started"
        );
        state.by_topic.insert(debate.topic.id.clone(), debate.id.clone());
        state.debates.insert(debate.id.clone(), debate.clone());
        Ok(debate)
    }

    /// Append a message, then evaluate termination. Returns the current
    /// debate. Messages to a non-active debate are refused and the debate
    /// is left unchanged.
    pub fn add_message(&self, debate_id: &str, msg: AgentMessage) -> DebateResult<Debate> {
        let mut state = self.state.lock().expect("debate lock poisoned");
        let debate = state
            .debates
            .get_mut(debate_id)
            .ok_or_else(|| DebateError::NotFound(debate_id.to_string()))?;
        if debate.status != DebateStatus::Active {
            return Err(DebateError::Frozen(debate_id.to_string()));
        }
        debate.messages.push(msg);

        let concluded = debate.first_message_of(MessageType::Concede).is_some()
            || debate.first_message_of(MessageType::Consensus).is_some()
            || (debate.messages.len() / 2) as u32 >= self.config.max_rounds;
        if concluded {
            let resolution = compute_resolution(debate, &self.config);
            seal(debate, resolution);
        }
        Ok(debate.clone())
    }

    /// Mark resolved, computing the resolution from the recorded messages.
    /// A debate that already left `Active` is returned unchanged.
    pub fn resolve_debate(&self, debate_id: &str) -> DebateResult<Debate> {
        let mut state = self.state.lock().expect("debate lock poisoned");
        let debate = state
            .debates
            .get_mut(debate_id)
            .ok_or_else(|| DebateError::NotFound(debate_id.to_string()))?;
        if debate.status == DebateStatus::Active {
            let resolution = compute_resolution(debate, &self.config);
            seal(debate, resolution);
        }
        Ok(debate.clone())
    }

    /// Mark resolved with an externally computed resolution (arbiter path).
    pub fn resolve_with(
        &self,
        debate_id: &str,
        resolution: DebateResolution,
    ) -> DebateResult<Debate> {
        let mut state = self.state.lock().expect("debate lock poisoned");
        let debate = state
            .debates
            .get_mut(debate_id)
            .ok_or_else(|| DebateError::NotFound(debate_id.to_string()))?;
        if debate.status == DebateStatus::Active {
            seal(debate, resolution);
        }
        Ok(debate.clone())
    }

    /// Mark escalated and append the broadcast escalate notice.
    pub fn escalate_debate(&self, debate_id: &str, reason: &str) -> DebateResult<Debate> {
        let mut state = self.state.lock().expect("debate lock poisoned");
        let debate = state
            .debates
            .get_mut(debate_id)
            .ok_or_else(|| DebateError::NotFound(debate_id.to_string()))?;
        if debate.status == DebateStatus::Active {
            let notice = AgentMessage::escalate(debate.challenger, reason);
            debate.messages.push(notice);
            debate.status = DebateStatus::Escalated;
            debate.resolved_at = Some(Utc::now());
            info!(debate_id = %debate.id, reason, "debate escalated");
        }
        Ok(debate.clone())
    }

    pub fn get(&self, debate_id: &str) -> Option<Debate> {
        let state = self.state.lock().expect("debate lock poisoned");
        state.debates.get(debate_id).cloned()
    }

    /// The most recent debate whose topic is `finding_id`, any status.
    pub fn debate_for_finding(&self, finding_id: &str) -> Option<Debate> {
        let state = self.state.lock().expect("debate lock poisoned");
        let id = state.by_topic.get(finding_id)?;
        state.debates.get(id).cloned()
    }

    pub fn active_debates(&self) -> Vec<Debate> {
        let state = self.state.lock().expect("debate lock poisoned");
        let mut active: Vec<Debate> = state
            .debates
            .values()
            .filter(|d| d.status == DebateStatus::Active)
            .cloned()
            .collect();
        active.sort_by(|a, b| a.id.cmp(&b.id));
        active
    }

    pub fn all_debates(&self) -> Vec<Debate> {
        let state = self.state.lock().expect("debate lock poisoned");
        let mut all: Vec<Debate> = state.debates.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}

fn seal(debate: &mut Debate, resolution: DebateResolution) {
    debug!(
        debate_id = %debate.id,
        accepted = resolution.accepted,
        final_confidence = resolution.final_confidence,
        "debate resolved"
    );
    debate.status = DebateStatus::Resolved;
    debate.resolved_at = Some(Utc::now());
    debate.resolution = Some(resolution);
}

/// Resolution rules, in order: concede, consensus, then voting.
fn compute_resolution(debate: &Debate, config: &DebateConfig) -> DebateResolution {
    if let Some(concede) = debate.first_message_of(MessageType::Concede) {
        let conceder = concede.from;
        let accepted = conceder == debate.challenger;
        let votes = BTreeMap::from([(conceder, !accepted)]);
        return if accepted {
            DebateResolution::accepted(
                format!("{conceder} conceded: {}", concede.content.text),
                votes,
                debate.topic.confidence,
            )
        } else {
            DebateResolution::rejected(
                format!("{conceder} conceded: {}", concede.content.text),
                votes,
            )
        };
    }

    if let Some(consensus) = debate.first_message_of(MessageType::Consensus) {
        let confidence = consensus
            .content
            .confidence
            .unwrap_or(debate.topic.confidence);
        return DebateResolution::accepted(
            format!("consensus: {}", consensus.content.text),
            debate.recorded_votes(),
            confidence,
        );
    }

    let mut votes = debate.recorded_votes();
    if votes.is_empty() {
        // An unanswered challenge stands as the challenger's no-vote.
        votes.insert(debate.challenger, false);
    }
    let decision = voting::tally(&votes, config.strategy, debate.topic.debt_type, &config.weights);
    let challenge_text = debate
        .first_message_of(MessageType::Challenge)
        .map(|m| m.content.text.clone())
        .unwrap_or_default();
    let reason = format!(
        "{} vote ({} yes / {} no): {}",
        config.strategy, decision.yes, decision.no, challenge_text
    );
    if decision.accepted {
        let confidence =
            (decision.yes as f64 / votes.len().max(1) as f64) * debate.topic.confidence;
        DebateResolution::accepted(reason, votes, confidence)
    } else {
        DebateResolution::rejected(reason, votes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::{DebtType, Severity};

    fn low_confidence_finding() -> Finding {
        Finding::new(
            DebtType::CodeSmell,
            Severity::Low,
            0.4,
            "vague smell",
            "hard to say",
            "a.ts",
            None,
            None,
        )
    }

    fn manager() -> DebateManager {
        DebateManager::new(DebateConfig::default())
    }

    fn open_debate(manager: &DebateManager) -> Debate {
        manager
            .start_debate(
                low_confidence_finding(),
                AgentRole::Scanner,
                AgentRole::Critic,
                "confidence 0.40 below challenge threshold 0.70",
                vec![],
            )
            .unwrap()
    }

    #[test]
    fn duplicate_active_debate_is_an_invariant_error() {
        let manager = manager();
        let debate = open_debate(&manager);
        let err = manager.start_debate(
            debate.topic.clone(),
            AgentRole::Scanner,
            AgentRole::Critic,
            "again",
            vec![],
        );
        assert!(matches!(err, Err(DebateError::AlreadyDebated(_))));
    }

    #[test]
    fn resolved_topic_can_be_debated_again() {
        let manager = manager();
        let debate = open_debate(&manager);
        manager.resolve_debate(&debate.id).unwrap();
        let again = manager.start_debate(
            debate.topic.clone(),
            AgentRole::Scanner,
            AgentRole::Critic,
            "second pass",
            vec![],
        );
        assert!(again.is_ok());
    }

    #[test]
    fn critic_concede_accepts_finding_at_original_confidence() {
        let manager = manager();
        let debate = open_debate(&manager);
        let updated = manager
            .add_message(
                &debate.id,
                AgentMessage::concede(AgentRole::Critic, "evidence convinced me", None),
            )
            .unwrap();
        assert_eq!(updated.status, DebateStatus::Resolved);
        let resolution = updated.resolution.unwrap();
        assert!(resolution.accepted);
        assert!((resolution.final_confidence - 0.4).abs() < 1e-9);
        assert_eq!(resolution.votes.get(&AgentRole::Critic), Some(&false));
    }

    #[test]
    fn initiator_concede_rejects_with_zero_confidence() {
        let manager = manager();
        let debate = open_debate(&manager);
        let updated = manager
            .add_message(
                &debate.id,
                AgentMessage::concede(AgentRole::Scanner, "fair point", None),
            )
            .unwrap();
        let resolution = updated.resolution.unwrap();
        assert!(!resolution.accepted);
        assert_eq!(resolution.final_confidence, 0.0);
    }

    #[test]
    fn consensus_accepts_with_stated_confidence() {
        let manager = manager();
        let debate = open_debate(&manager);
        let updated = manager
            .add_message(
                &debate.id,
                AgentMessage::consensus(AgentRole::Critic, "agreed after review", Some(0.85), None),
            )
            .unwrap();
        let resolution = updated.resolution.unwrap();
        assert!(resolution.accepted);
        assert!((resolution.final_confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn unanswered_challenge_rejects_under_weighted() {
        let manager = manager();
        let debate = open_debate(&manager);
        let resolved = manager.resolve_debate(&debate.id).unwrap();
        let resolution = resolved.resolution.unwrap();
        assert!(!resolution.accepted);
        assert_eq!(resolution.final_confidence, 0.0);
        assert!(resolution.reason.contains("confidence"));
    }

    #[test]
    fn round_limit_triggers_vote_resolution() {
        let manager = DebateManager::new(DebateConfig {
            max_rounds: 2,
            ..DebateConfig::default()
        });
        let debate = open_debate(&manager);
        // Challenge (1) + vote (2) + vote (3) + vote (4) => floor(4/2)=2 rounds.
        let m1 = AgentMessage::vote(AgentRole::Scanner, true, 0.8, None);
        let m2 = AgentMessage::vote(AgentRole::Architect, true, 0.7, None);
        let m3 = AgentMessage::vote(AgentRole::Historian, true, 0.6, None);
        manager.add_message(&debate.id, m1).unwrap();
        let after_three = manager.add_message(&debate.id, m2).unwrap();
        assert_eq!(after_three.status, DebateStatus::Active);
        let resolved = manager.add_message(&debate.id, m3).unwrap();
        assert_eq!(resolved.status, DebateStatus::Resolved);
        let resolution = resolved.resolution.unwrap();
        assert!(resolution.accepted);
        // 3 yes of 3 votes at topic confidence 0.4.
        assert!((resolution.final_confidence - 0.4).abs() < 1e-9);
    }

    #[test]
    fn frozen_debate_refuses_messages_unchanged() {
        let manager = manager();
        let debate = open_debate(&manager);
        manager.resolve_debate(&debate.id).unwrap();
        let before = manager.get(&debate.id).unwrap();
        let err = manager.add_message(
            &debate.id,
            AgentMessage::vote(AgentRole::Scanner, true, 0.9, None),
        );
        assert!(matches!(err, Err(DebateError::Frozen(_))));
        let after = manager.get(&debate.id).unwrap();
        assert_eq!(before.messages.len(), after.messages.len());
        assert_eq!(after.status, DebateStatus::Resolved);
    }

    #[test]
    fn unknown_debate_is_not_found() {
        let manager = manager();
        let err = manager.add_message(
            "missing",
            AgentMessage::vote(AgentRole::Scanner, true, 0.9, None),
        );
        assert!(matches!(err, Err(DebateError::NotFound(_))));
    }

    #[test]
    fn escalation_freezes_with_broadcast_notice() {
        let manager = manager();
        let debate = open_debate(&manager);
        let escalated = manager
            .escalate_debate(&debate.id, "needs arbiter")
            .unwrap();
        assert_eq!(escalated.status, DebateStatus::Escalated);
        let last = escalated.messages.last().unwrap();
        assert_eq!(last.msg_type, MessageType::Escalate);
        assert_eq!(last.to, Recipient::Broadcast);
        assert!(manager
            .add_message(&debate.id, AgentMessage::vote(AgentRole::Scanner, true, 0.9, None))
            .is_err());
    }

    #[test]
    fn timeout_exposure() {
        let manager = manager();
        let debate = open_debate(&manager);
        let now = debate.started_at + Duration::milliseconds(31_000);
        assert!(debate.is_timed_out(30_000, now));
        assert!(!debate.is_timed_out(60_000, now));
        assert!(!manager.active_debates().is_empty());
    }
}
