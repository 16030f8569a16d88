//! Cross-cutting error records.
//!
//! Runners never abort on a single failed item; they accumulate
//! [`AgentError`] records that surface on the final scan outcome.

use serde::{Deserialize, Serialize};

use crate::finding::AgentRole;

/// One recorded failure inside an agent's run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentError {
    pub agent: AgentRole,
    /// The file or finding that failed, when the failure is item-scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    pub message: String,
    /// Recoverable errors skip the item; non-recoverable ones end the
    /// agent's run with partial results.
    pub recoverable: bool,
}

impl AgentError {
    pub fn recoverable(
        agent: AgentRole,
        item: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            agent,
            item,
            message: message.into(),
            recoverable: true,
        }
    }

    pub fn fatal(agent: AgentRole, message: impl Into<String>) -> Self {
        Self {
            agent,
            item: None,
            message: message.into(),
            recoverable: false,
        }
    }
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.item {
            Some(item) => write!(f, "[{}] {}: {}", self.agent, item, self.message),
            None => write!(f, "[{}] {}", self.agent, self.message),
        }
    }
}
