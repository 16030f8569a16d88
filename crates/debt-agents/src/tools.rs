//! Tool-call schemas — the only structured channel between the LLM and
//! the pipeline.
//!
//! Runners never parse natural-language output for findings; they consume
//! exactly three tool names. Argument shapes are schemars-derived so every
//! transport sees the same JSON schema.

use adjudication::finding::{CriticReview, DebtType, Finding, Severity, Span};
use adjudication::identity;
use adjudication::ports::llm::{ToolCall, ToolSpec};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const REPORT_DEBT: &str = "report_debt";
pub const VALIDATE_FINDING: &str = "validate_finding";
pub const REJECT_FINDING: &str = "reject_finding";

/// Arguments of a `report_debt` call.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReportDebtArgs {
    pub debt_type: DebtType,
    pub severity: Severity,
    /// Reporter confidence in [0.0, 1.0].
    pub confidence: f64,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    /// 1-indexed inclusive range; provide both bounds or neither.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

/// Arguments of a `validate_finding` call.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ValidateFindingArgs {
    pub finding_id: String,
    /// The critic's adjusted confidence.
    pub confidence: f64,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Arguments of a `reject_finding` call.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RejectFindingArgs {
    pub finding_id: String,
    pub reason: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

fn tool_spec<T: JsonSchema>(name: &str, description: &str) -> ToolSpec {
    let schema = schemars::schema_for!(T);
    ToolSpec {
        name: name.to_string(),
        description: description.to_string(),
        parameters: serde_json::to_value(schema).unwrap_or_default(),
    }
}

/// Toolset handed to Scanner, Architect, and Historian.
pub fn discovery_toolset() -> Vec<ToolSpec> {
    vec![tool_spec::<ReportDebtArgs>(
        REPORT_DEBT,
        "Report one piece of technical debt found in the file under analysis",
    )]
}

/// Toolset handed to the Critic.
pub fn critic_toolset() -> Vec<ToolSpec> {
    vec![
        tool_spec::<ValidateFindingArgs>(
            VALIDATE_FINDING,
            "Accept the reviewed finding, stating your adjusted confidence",
        ),
        tool_spec::<RejectFindingArgs>(
            REJECT_FINDING,
            "Reject the reviewed finding, stating why",
        ),
    ]
}

/// Turn a `report_debt` call into a finding.
///
/// Invalid arguments (out-of-range confidence, half-open or inverted line
/// ranges, schema mismatch) are rejected silently — the caller records a
/// schema error and skips the item.
pub fn finding_from_report(
    call: &ToolCall,
    default_file: &str,
    file_content: Option<&str>,
) -> Option<Finding> {
    if call.name != REPORT_DEBT {
        return None;
    }
    let args: ReportDebtArgs = match serde_json::from_value(call.args.clone()) {
        Ok(args) => args,
        Err(e) => {
            debug!(error = %e, "report_debt arguments failed validation");
            return None;
        }
    };
    if !(0.0..=1.0).contains(&args.confidence) {
        return None;
    }
    let span = match (args.start_line, args.end_line) {
        (Some(start), Some(end)) => Some(Span::new(start, end)?),
        (None, None) => None,
        // Half-open ranges are malformed.
        _ => return None,
    };
    let file_path = args.file_path.as_deref().unwrap_or(default_file);
    let span_text = match (span, file_content) {
        (Some(span), Some(content)) => Some(identity::span_text(content, span)),
        _ => None,
    };
    let mut finding = Finding::new(
        args.debt_type,
        args.severity,
        args.confidence,
        args.title,
        args.description,
        file_path,
        span,
        span_text.as_deref(),
    )
    .with_evidence(args.evidence);
    if let Some(fix) = args.suggested_fix {
        finding = finding.with_suggested_fix(fix);
    }
    Some(finding)
}

/// Turn a critic tool-call into a review for `finding_id`.
pub fn review_from_call(call: &ToolCall, finding_id: &str) -> Option<CriticReview> {
    match call.name.as_str() {
        VALIDATE_FINDING => {
            let args: ValidateFindingArgs = serde_json::from_value(call.args.clone()).ok()?;
            if !(0.0..=1.0).contains(&args.confidence) {
                return None;
            }
            Some(CriticReview {
                finding_id: finding_id.to_string(),
                accepted: true,
                confidence: args.confidence,
                reason: args.reason.unwrap_or_else(|| "validated".to_string()),
            })
        }
        REJECT_FINDING => {
            let args: RejectFindingArgs = serde_json::from_value(call.args.clone()).ok()?;
            Some(CriticReview {
                finding_id: finding_id.to_string(),
                accepted: false,
                confidence: args.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
                reason: args.reason,
            })
        }
        _ => None,
    }
}
