//! Typed inter-agent messages.
//!
//! Messages are immutable once published. Construction goes through the
//! typed helpers so the vote invariant (a vote payload only on `vote`
//! messages) holds by construction; the generic [`AgentMessage::new`]
//! validates it for callers assembling messages by hand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::finding::{AgentRole, Finding};
use crate::identity;

/// Error type for message construction.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("vote payload is only valid on vote messages")]
    VotePayloadOutsideVote,
}

/// Message discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Finding,
    Challenge,
    Evidence,
    Concede,
    Defend,
    Escalate,
    Consensus,
    Vote,
}

impl MessageType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Finding => "finding",
            Self::Challenge => "challenge",
            Self::Evidence => "evidence",
            Self::Concede => "concede",
            Self::Defend => "defend",
            Self::Escalate => "escalate",
            Self::Consensus => "consensus",
            Self::Vote => "vote",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination of a message: a single role or everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipient {
    Broadcast,
    Role(AgentRole),
}

impl Recipient {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Broadcast => "broadcast",
            Self::Role(role) => role.as_str(),
        }
    }
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Recipient {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Recipient {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == "broadcast" {
            return Ok(Self::Broadcast);
        }
        let role = serde_json::from_value(serde_json::Value::String(raw.clone()))
            .map_err(|_| serde::de::Error::custom(format!("unknown recipient: {raw}")))?;
        Ok(Self::Role(role))
    }
}

/// Payload of a message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageContent {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finding: Option<Finding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// A message between agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub id: String,
    pub from: AgentRole,
    pub to: Recipient,
    #[serde(rename = "type")]
    pub msg_type: MessageType,
    pub content: MessageContent,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
}

impl AgentMessage {
    /// Generic constructor; rejects a vote payload on non-vote messages.
    pub fn new(
        from: AgentRole,
        to: Recipient,
        msg_type: MessageType,
        content: MessageContent,
        in_reply_to: Option<String>,
    ) -> Result<Self, MessageError> {
        if content.vote.is_some() && msg_type != MessageType::Vote {
            return Err(MessageError::VotePayloadOutsideVote);
        }
        Ok(Self {
            id: identity::next_id(),
            from,
            to,
            msg_type,
            content,
            timestamp: Utc::now(),
            in_reply_to,
        })
    }

    /// Announce a freshly discovered finding.
    pub fn finding(from: AgentRole, finding: Finding) -> Self {
        Self {
            id: identity::next_id(),
            from,
            to: Recipient::Broadcast,
            msg_type: MessageType::Finding,
            content: MessageContent {
                text: finding.title.clone(),
                finding: Some(finding),
                ..Default::default()
            },
            timestamp: Utc::now(),
            in_reply_to: None,
        }
    }

    /// Challenge a finding, seeding a debate.
    pub fn challenge(
        from: AgentRole,
        to: Recipient,
        finding: Finding,
        reason: impl Into<String>,
        evidence: Vec<String>,
    ) -> Self {
        Self {
            id: identity::next_id(),
            from,
            to,
            msg_type: MessageType::Challenge,
            content: MessageContent {
                text: reason.into(),
                finding: Some(finding),
                evidence,
                ..Default::default()
            },
            timestamp: Utc::now(),
            in_reply_to: None,
        }
    }

    /// Cast a vote in a debate.
    pub fn vote(
        from: AgentRole,
        vote: bool,
        confidence: f64,
        in_reply_to: Option<String>,
    ) -> Self {
        Self {
            id: identity::next_id(),
            from,
            to: Recipient::Broadcast,
            msg_type: MessageType::Vote,
            content: MessageContent {
                text: if vote { "yes".into() } else { "no".into() },
                vote: Some(vote),
                confidence: Some(confidence),
                ..Default::default()
            },
            timestamp: Utc::now(),
            in_reply_to,
        }
    }

    /// Concede the debate.
    pub fn concede(from: AgentRole, reason: impl Into<String>, in_reply_to: Option<String>) -> Self {
        Self {
            id: identity::next_id(),
            from,
            to: Recipient::Broadcast,
            msg_type: MessageType::Concede,
            content: MessageContent {
                text: reason.into(),
                ..Default::default()
            },
            timestamp: Utc::now(),
            in_reply_to,
        }
    }

    /// Declare consensus, optionally with an agreed confidence.
    pub fn consensus(
        from: AgentRole,
        text: impl Into<String>,
        confidence: Option<f64>,
        in_reply_to: Option<String>,
    ) -> Self {
        Self {
            id: identity::next_id(),
            from,
            to: Recipient::Broadcast,
            msg_type: MessageType::Consensus,
            content: MessageContent {
                text: text.into(),
                confidence,
                ..Default::default()
            },
            timestamp: Utc::now(),
            in_reply_to,
        }
    }

    /// Broadcast an escalation notice.
    pub fn escalate(from: AgentRole, reason: impl Into<String>) -> Self {
        Self {
            id: identity::next_id(),
            from,
            to: Recipient::Broadcast,
            msg_type: MessageType::Escalate,
            content: MessageContent {
                text: reason.into(),
                ..Default::default()
            },
            timestamp: Utc::now(),
            in_reply_to: None,
        }
    }

    /// Whether this message directly references the given finding.
    pub fn references_finding(&self, finding_id: &str) -> bool {
        self.content
            .finding
            .as_ref()
            .is_some_and(|f| f.id == finding_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::{DebtType, Finding, Severity};

    fn sample_finding() -> Finding {
        Finding::new(
            DebtType::CodeSmell,
            Severity::Low,
            0.6,
            "long method",
            "method exceeds 80 lines",
            "a.ts",
            None,
            None,
        )
    }

    #[test]
    fn vote_payload_rejected_on_non_vote() {
        let content = MessageContent {
            text: "sneaky".into(),
            vote: Some(true),
            ..Default::default()
        };
        let err = AgentMessage::new(
            AgentRole::Critic,
            Recipient::Broadcast,
            MessageType::Evidence,
            content,
            None,
        );
        assert!(err.is_err());
    }

    #[test]
    fn vote_helper_carries_payload() {
        let msg = AgentMessage::vote(AgentRole::Scanner, true, 0.8, None);
        assert_eq!(msg.msg_type, MessageType::Vote);
        assert_eq!(msg.content.vote, Some(true));
    }

    #[test]
    fn recipient_serde_round_trip() {
        let json = serde_json::to_string(&Recipient::Broadcast).unwrap();
        assert_eq!(json, "\"broadcast\"");
        let json = serde_json::to_string(&Recipient::Role(AgentRole::Critic)).unwrap();
        assert_eq!(json, "\"critic\"");
        let parsed: Recipient = serde_json::from_str("\"architect\"").unwrap();
        assert_eq!(parsed, Recipient::Role(AgentRole::Architect));
    }

    #[test]
    fn challenge_references_its_finding() {
        let finding = sample_finding();
        let id = finding.id.clone();
        let msg = AgentMessage::challenge(
            AgentRole::Critic,
            Recipient::Broadcast,
            finding,
            "confidence too low",
            vec![],
        );
        assert!(msg.references_finding(&id));
        assert!(!msg.references_finding("other"));
    }
}
