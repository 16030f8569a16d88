//! The roster — agents as configuration rows, not classes.
//!
//! Each agent is a (role, model, prompts, toolset) row driven by the
//! uniform runner. Adding an agent means adding a row.

use adjudication::finding::AgentRole;
use adjudication::ports::llm::ToolSpec;

use crate::prompts::{self, PromptBundle};
use crate::tools;

/// One configured agent.
#[derive(Debug, Clone)]
pub struct AgentSpec {
    pub role: AgentRole,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub prompts: PromptBundle,
    pub tools: Vec<ToolSpec>,
}

/// The configured set of agents for a scan.
#[derive(Debug, Clone)]
pub struct Roster {
    specs: Vec<AgentSpec>,
}

impl Roster {
    /// The standard five-agent roster on a single model.
    pub fn standard(model: &str) -> Self {
        let spec = |role: AgentRole, system: &str, user: &str, tools: Vec<ToolSpec>| AgentSpec {
            role,
            model: model.to_string(),
            temperature: 0.2,
            max_tokens: 4096,
            prompts: PromptBundle::new(system, user),
            tools,
        };
        Self {
            specs: vec![
                spec(
                    AgentRole::Scanner,
                    prompts::SCANNER_SYSTEM,
                    prompts::SCANNER_USER,
                    tools::discovery_toolset(),
                ),
                spec(
                    AgentRole::Architect,
                    prompts::ARCHITECT_SYSTEM,
                    prompts::ARCHITECT_USER,
                    tools::discovery_toolset(),
                ),
                spec(
                    AgentRole::Historian,
                    prompts::HISTORIAN_SYSTEM,
                    prompts::HISTORIAN_USER,
                    tools::discovery_toolset(),
                ),
                spec(
                    AgentRole::Critic,
                    prompts::CRITIC_SYSTEM,
                    prompts::CRITIC_USER,
                    tools::critic_toolset(),
                ),
            ],
        }
    }

    pub fn get(&self, role: AgentRole) -> Option<&AgentSpec> {
        self.specs.iter().find(|s| s.role == role)
    }

    /// Replace or add a row.
    pub fn upsert(&mut self, spec: AgentSpec) {
        match self.specs.iter_mut().find(|s| s.role == spec.role) {
            Some(existing) => *existing = spec,
            None => self.specs.push(spec),
        }
    }

    pub fn roles(&self) -> impl Iterator<Item = AgentRole> + '_ {
        self.specs.iter().map(|s| s.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_roster_has_discovery_and_critic_rows() {
        let roster = Roster::standard("debt-model");
        for role in [
            AgentRole::Scanner,
            AgentRole::Architect,
            AgentRole::Historian,
            AgentRole::Critic,
        ] {
            assert!(roster.get(role).is_some(), "missing {role}");
        }
        assert_eq!(roster.get(AgentRole::Critic).unwrap().tools.len(), 2);
        assert_eq!(roster.get(AgentRole::Scanner).unwrap().tools.len(), 1);
    }

    #[test]
    fn upsert_replaces_existing_row() {
        let mut roster = Roster::standard("debt-model");
        let mut custom = roster.get(AgentRole::Scanner).unwrap().clone();
        custom.model = "bigger-model".into();
        roster.upsert(custom);
        assert_eq!(roster.get(AgentRole::Scanner).unwrap().model, "bigger-model");
        assert_eq!(roster.roles().count(), 4);
    }
}
