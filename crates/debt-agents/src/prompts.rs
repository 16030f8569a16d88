//! Prompt bundles for each agent role.
//!
//! Templates are externally supplied configuration; these are the shipped
//! defaults. Rendering is plain placeholder substitution.

use serde::{Deserialize, Serialize};

/// System prompt + user template for one role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptBundle {
    pub system: String,
    pub user_template: String,
}

impl PromptBundle {
    pub fn new(system: impl Into<String>, user_template: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user_template: user_template.into(),
        }
    }

    /// Substitute `{key}` placeholders in the user template.
    pub fn render_user(&self, values: &[(&str, &str)]) -> String {
        render(&self.user_template, values)
    }
}

/// Substitute `{key}` placeholders in `template`.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in values {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

pub const SCANNER_SYSTEM: &str = "You are a code-quality scanner in a technical-debt \
analysis swarm. Examine the file for smells, duplication, dead code, missing tests, \
hardcoded configuration, and security issues. Report every distinct item through the \
report_debt tool with precise line ranges and concrete evidence. Do not report debt \
you are not reasonably confident about.";

pub const SCANNER_USER: &str = "File: {file_path}\n\n```\n{content}\n```\n\nReport each \
piece of technical debt you find via report_debt.";

pub const ARCHITECT_SYSTEM: &str = "You are a software architect in a technical-debt \
analysis swarm. Examine the file for structural debt: god classes, feature envy, \
excessive complexity, and layering problems. Report findings through the report_debt \
tool with line ranges and evidence. Focus on structure, not style.";

pub const ARCHITECT_USER: &str = "File: {file_path}\n\n```\n{content}\n```\n\nReport \
each structural problem via report_debt.";

pub const HISTORIAN_SYSTEM: &str = "You are a repository historian in a technical-debt \
analysis swarm. Given a file and its recent commit history, report debt that only \
history reveals: churn hotspots, repeatedly patched fragile code, stale documentation. \
Use the report_debt tool.";

pub const HISTORIAN_USER: &str = "File: {file_path}\n\nRecent history:\n{history}\n\n```\n{content}\n```\n\nReport \
history-informed debt via report_debt.";

pub const CRITIC_SYSTEM: &str = "You are the critic in a technical-debt analysis swarm. \
Review the reported finding skeptically: does the evidence support it, is the severity \
justified, is the classification right? Answer with exactly one tool call: \
validate_finding with your adjusted confidence, or reject_finding with the reason.";

pub const CRITIC_USER: &str = "Review this finding:\n\n{finding}\n\nRespond with \
validate_finding or reject_finding.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_all_placeholders() {
        let bundle = PromptBundle::new("sys", "File: {file_path}\n{content}");
        let rendered = bundle.render_user(&[("file_path", "a.ts"), ("content", "let x;")]);
        assert_eq!(rendered, "File: a.ts\nlet x;");
    }

    #[test]
    fn unknown_placeholders_are_left_alone() {
        assert_eq!(render("{missing}", &[("other", "v")]), "{missing}");
    }
}
