//! Finding model — the unit of technical debt every agent argues about.
//!
//! Findings are values: once published they are never mutated. Adjusting
//! confidence or severity after a debate produces a copy.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::identity;

/// Role of an agent in the swarm.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Per-file debt discovery.
    Scanner,
    /// Structural analysis: dependency graph, layering.
    Architect,
    /// Git-history enrichment.
    Historian,
    /// Reviews and challenges discovery findings.
    Critic,
    /// Consumes validated findings to build the plan.
    Planner,
}

impl AgentRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scanner => "scanner",
            Self::Architect => "architect",
            Self::Historian => "historian",
            Self::Critic => "critic",
            Self::Planner => "planner",
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed taxonomy of debt categories.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum DebtType {
    CodeSmell,
    Complexity,
    Duplication,
    DeadCode,
    CircularDependency,
    LayerViolation,
    GodClass,
    FeatureEnvy,
    OutdatedDependency,
    VulnerableDependency,
    MissingLockFile,
    LowCoverage,
    MissingTests,
    FlakyTests,
    MissingDocs,
    OutdatedDocs,
    HardcodedConfig,
    SecurityIssue,
}

impl DebtType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CodeSmell => "code_smell",
            Self::Complexity => "complexity",
            Self::Duplication => "duplication",
            Self::DeadCode => "dead_code",
            Self::CircularDependency => "circular_dependency",
            Self::LayerViolation => "layer_violation",
            Self::GodClass => "god_class",
            Self::FeatureEnvy => "feature_envy",
            Self::OutdatedDependency => "outdated_dependency",
            Self::VulnerableDependency => "vulnerable_dependency",
            Self::MissingLockFile => "missing_lock_file",
            Self::LowCoverage => "low_coverage",
            Self::MissingTests => "missing_tests",
            Self::FlakyTests => "flaky_tests",
            Self::MissingDocs => "missing_docs",
            Self::OutdatedDocs => "outdated_docs",
            Self::HardcodedConfig => "hardcoded_config",
            Self::SecurityIssue => "security_issue",
        }
    }
}

impl std::fmt::Display for DebtType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity scale. Declaration order is ascending so `Ord` and `max`
/// agree with the numeric ranking used for severity gaps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Numeric rank: critical=4, high=3, medium=2, low=1, info=0.
    pub fn rank(self) -> u8 {
        match self {
            Self::Info => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }

    /// Plan priority: 1 is the most urgent.
    pub fn priority(self) -> u8 {
        match self {
            Self::Critical => 1,
            Self::High => 3,
            Self::Medium => 5,
            Self::Low => 7,
            Self::Info => 9,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive, 1-indexed line range. Both bounds are always present;
/// a finding without line information carries no `Span` at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Returns `None` when `start > end` or `start` is 0.
    pub fn new(start: u32, end: u32) -> Option<Self> {
        if start == 0 || start > end {
            return None;
        }
        Some(Self { start, end })
    }

    /// Number of lines covered.
    pub fn len(self) -> u32 {
        self.end - self.start + 1
    }

    pub fn is_empty(self) -> bool {
        false
    }

    /// Whether two ranges share at least one line.
    pub fn overlaps(self, other: Span) -> bool {
        !(self.end < other.start || other.end < self.start)
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A single reported piece of technical debt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub debt_type: DebtType,
    pub severity: Severity,
    /// Reporter confidence in [0.0, 1.0].
    pub confidence: f64,
    pub title: String,
    pub description: String,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    /// Ordered supporting snippets or observations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
    /// Stable content hash used for temporal tracking across scans.
    pub fingerprint: String,
}

impl Finding {
    /// Construct a finding with a fresh id. The fingerprint is computed
    /// from the normalized span text when provided, the title otherwise.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        debt_type: DebtType,
        severity: Severity,
        confidence: f64,
        title: impl Into<String>,
        description: impl Into<String>,
        file_path: impl Into<String>,
        span: Option<Span>,
        span_text: Option<&str>,
    ) -> Self {
        let title = title.into();
        let file_path = file_path.into();
        let fingerprint = identity::fingerprint(debt_type, &file_path, span_text, &title);
        Self {
            id: identity::next_id(),
            debt_type,
            severity,
            confidence: confidence.clamp(0.0, 1.0),
            title,
            description: description.into(),
            file_path,
            span,
            evidence: Vec::new(),
            suggested_fix: None,
            fingerprint,
        }
    }

    pub fn with_evidence(mut self, evidence: Vec<String>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_suggested_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }

    /// Copy with adjusted confidence (post-debate).
    pub fn with_confidence(&self, confidence: f64) -> Self {
        let mut copy = self.clone();
        copy.confidence = confidence.clamp(0.0, 1.0);
        copy
    }

    /// Copy with replaced severity (applied when a debate resolution
    /// carries an adjusted severity).
    pub fn with_severity(&self, severity: Severity) -> Self {
        let mut copy = self.clone();
        copy.severity = severity;
        copy
    }
}

/// The Critic's verdict on one finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticReview {
    pub finding_id: String,
    pub accepted: bool,
    /// The critic's adjusted confidence in the finding.
    pub confidence: f64,
    pub reason: String,
}
