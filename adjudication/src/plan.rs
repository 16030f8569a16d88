//! Remediation-plan synthesis.
//!
//! Validated findings are grouped by (file, debt type) into tasks, ranked
//! by the severity→priority map, and bucketed into quick wins, strategic
//! work, and deferrable items. The three buckets partition the task list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::finding::{DebtType, Finding, Severity};
use crate::identity;

/// Relative implementation cost of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatedEffort {
    Trivial,
    Small,
    Medium,
    Large,
    Xlarge,
}

impl EstimatedEffort {
    /// Default effort per debt type.
    pub fn for_debt_type(debt_type: DebtType) -> Self {
        match debt_type {
            DebtType::SecurityIssue => Self::Xlarge,
            DebtType::CircularDependency | DebtType::LayerViolation | DebtType::GodClass => {
                Self::Large
            }
            DebtType::Complexity
            | DebtType::Duplication
            | DebtType::MissingTests
            | DebtType::FeatureEnvy => Self::Medium,
            DebtType::CodeSmell | DebtType::DeadCode | DebtType::MissingDocs => Self::Small,
            DebtType::HardcodedConfig => Self::Trivial,
            _ => Self::Medium,
        }
    }

    /// Small enough to knock out opportunistically.
    pub fn is_quick(self) -> bool {
        matches!(self, Self::Trivial | Self::Small)
    }
}

/// One unit of remediation work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationTask {
    pub id: String,
    pub title: String,
    /// Semicolon-joined titles of the grouped findings.
    pub description: String,
    pub file_path: String,
    pub related_debt_ids: Vec<String>,
    pub estimated_effort: EstimatedEffort,
    /// 1 is the most urgent; derived from the group's highest severity.
    pub priority: u8,
    /// Ids of same-file tasks that must land first.
    pub dependencies: Vec<String>,
    pub suggested_approach: String,
    pub risks: Vec<String>,
    pub acceptance_criteria: Vec<String>,
}

/// The pipeline's final output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationPlan {
    pub scan_id: String,
    pub summary: String,
    pub total_debt_items: usize,
    /// Sorted by priority ascending; ties by file path, then first debt id.
    pub prioritized_tasks: Vec<RemediationTask>,
    /// Task ids: low-effort, dependency-free.
    pub quick_wins: Vec<String>,
    /// Task ids: everything that is neither quick nor deferrable.
    pub strategic_work: Vec<String>,
    /// Task ids: priority below the attention threshold.
    pub deferrable: Vec<String>,
}

impl RemediationPlan {
    /// An empty plan for a scan that surfaced nothing.
    pub fn empty(scan_id: impl Into<String>) -> Self {
        synthesize_plan(scan_id, &[])
    }
}

const DEFAULT_APPROACH: &str = "Review and refactor the affected code";
const DEFERRABLE_PRIORITY: u8 = 7;

/// Build the remediation plan from validated findings.
pub fn synthesize_plan(scan_id: impl Into<String>, findings: &[Finding]) -> RemediationPlan {
    let scan_id = scan_id.into();

    // Group by (file, debt type); BTreeMap keeps group order deterministic.
    let mut groups: BTreeMap<(String, &'static str), Vec<&Finding>> = BTreeMap::new();
    for finding in findings {
        groups
            .entry((finding.file_path.clone(), finding.debt_type.as_str()))
            .or_default()
            .push(finding);
    }

    let mut tasks: Vec<RemediationTask> = groups
        .into_iter()
        .map(|((file_path, _), group)| build_task(file_path, &group))
        .collect();

    // Same-file tasks with a strictly lower priority number block this one.
    let snapshot: Vec<(String, String, u8)> = tasks
        .iter()
        .map(|t| (t.id.clone(), t.file_path.clone(), t.priority))
        .collect();
    for task in &mut tasks {
        task.dependencies = snapshot
            .iter()
            .filter(|(id, file, priority)| {
                *id != task.id && *file == task.file_path && *priority < task.priority
            })
            .map(|(id, _, _)| id.clone())
            .collect();
    }

    tasks.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.file_path.cmp(&b.file_path))
            .then_with(|| a.related_debt_ids.first().cmp(&b.related_debt_ids.first()))
    });

    let mut quick_wins = Vec::new();
    let mut deferrable = Vec::new();
    let mut strategic_work = Vec::new();
    for task in &tasks {
        if task.estimated_effort.is_quick() && task.dependencies.is_empty() {
            quick_wins.push(task.id.clone());
        } else if task.priority > DEFERRABLE_PRIORITY {
            deferrable.push(task.id.clone());
        } else {
            strategic_work.push(task.id.clone());
        }
    }

    let summary = summarize(findings, tasks.len(), quick_wins.len());
    info!(
        scan_id = %scan_id,
        findings = findings.len(),
        tasks = tasks.len(),
        quick_wins = quick_wins.len(),
        "plan synthesized"
    );

    RemediationPlan {
        scan_id,
        summary,
        total_debt_items: findings.len(),
        prioritized_tasks: tasks,
        quick_wins,
        strategic_work,
        deferrable,
    }
}

fn build_task(file_path: String, group: &[&Finding]) -> RemediationTask {
    let debt_type = group[0].debt_type;
    let top_severity = group
        .iter()
        .map(|f| f.severity)
        .max()
        .unwrap_or(Severity::Info);
    let suggested_approach = group
        .iter()
        .filter_map(|f| f.suggested_fix.as_deref())
        .find(|fix| !fix.is_empty())
        .unwrap_or(DEFAULT_APPROACH)
        .to_string();

    RemediationTask {
        id: identity::next_id(),
        title: format!("Address {debt_type} in {file_path}"),
        description: group
            .iter()
            .map(|f| f.title.as_str())
            .collect::<Vec<_>>()
            .join("; "),
        file_path,
        related_debt_ids: group.iter().map(|f| f.id.clone()).collect(),
        estimated_effort: EstimatedEffort::for_debt_type(debt_type),
        priority: top_severity.priority(),
        dependencies: Vec::new(),
        suggested_approach,
        risks: vec!["Regression in related functionality".to_string()],
        acceptance_criteria: vec!["Issue no longer present in code analysis".to_string()],
    }
}

/// Deterministic summary; zero-count sections are omitted.
fn summarize(findings: &[Finding], task_count: usize, quick_win_count: usize) -> String {
    let critical = findings
        .iter()
        .filter(|f| f.severity == Severity::Critical)
        .count();
    let high = findings
        .iter()
        .filter(|f| f.severity == Severity::High)
        .count();

    let mut summary = format!("Found {} items.", findings.len());
    if critical > 0 {
        summary.push_str(&format!(" {critical} critical need immediate attention."));
    }
    if high > 0 {
        summary.push_str(&format!(" {high} high-priority should be addressed soon."));
    }
    summary.push_str(&format!(
        " Organized into {task_count} tasks with {quick_win_count} quick wins."
    ));
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::Span;

    fn finding(
        debt_type: DebtType,
        severity: Severity,
        file: &str,
        confidence: f64,
    ) -> Finding {
        Finding::new(
            debt_type,
            severity,
            confidence,
            format!("{debt_type} in {file}"),
            "details",
            file,
            Span::new(1, 10),
            None,
        )
    }

    #[test]
    fn empty_scan_yields_empty_plan_with_exact_summary() {
        let plan = synthesize_plan("scan-1", &[]);
        assert_eq!(plan.total_debt_items, 0);
        assert!(plan.prioritized_tasks.is_empty());
        assert!(plan.quick_wins.is_empty());
        assert!(plan.strategic_work.is_empty());
        assert!(plan.deferrable.is_empty());
        assert_eq!(
            plan.summary,
            "Found 0 items. Organized into 0 tasks with 0 quick wins."
        );
    }

    #[test]
    fn critical_security_finding_is_strategic_not_quick() {
        let f = finding(DebtType::SecurityIssue, Severity::Critical, "a.ts", 0.9);
        let plan = synthesize_plan("scan-2", &[f]);
        assert_eq!(plan.prioritized_tasks.len(), 1);
        let task = &plan.prioritized_tasks[0];
        assert_eq!(task.priority, 1);
        assert_eq!(task.estimated_effort, EstimatedEffort::Xlarge);
        assert!(task.dependencies.is_empty());
        assert_eq!(plan.strategic_work, vec![task.id.clone()]);
        assert!(plan.quick_wins.is_empty());
        assert!(plan.deferrable.is_empty());
        assert_eq!(
            plan.summary,
            "Found 1 items. 1 critical need immediate attention. Organized into 1 tasks with 0 quick wins."
        );
    }

    #[test]
    fn grouping_merges_same_file_same_type() {
        let a = finding(DebtType::CodeSmell, Severity::Low, "a.ts", 0.7);
        let b = finding(DebtType::CodeSmell, Severity::Medium, "a.ts", 0.8);
        let plan = synthesize_plan("scan-3", &[a.clone(), b.clone()]);
        assert_eq!(plan.prioritized_tasks.len(), 1);
        let task = &plan.prioritized_tasks[0];
        assert_eq!(task.related_debt_ids.len(), 2);
        // Highest severity in the group drives priority.
        assert_eq!(task.priority, Severity::Medium.priority());
        assert!(task.description.contains(';'));
    }

    #[test]
    fn same_file_dependencies_point_at_higher_severity() {
        let smell = finding(DebtType::CodeSmell, Severity::Low, "a.ts", 0.7);
        let security = finding(DebtType::SecurityIssue, Severity::Critical, "a.ts", 0.9);
        let plan = synthesize_plan("scan-4", &[smell, security]);
        assert_eq!(plan.prioritized_tasks.len(), 2);
        let security_task = &plan.prioritized_tasks[0];
        let smell_task = &plan.prioritized_tasks[1];
        assert_eq!(security_task.priority, 1);
        assert!(security_task.dependencies.is_empty());
        assert_eq!(smell_task.dependencies, vec![security_task.id.clone()]);
        // Dependent task cannot be a quick win even though code_smell is small.
        assert!(!plan.quick_wins.contains(&smell_task.id));
    }

    #[test]
    fn buckets_partition_the_task_list() {
        let findings = vec![
            finding(DebtType::HardcodedConfig, Severity::Low, "cfg.ts", 0.9),
            finding(DebtType::SecurityIssue, Severity::Critical, "auth.ts", 0.9),
            finding(DebtType::MissingDocs, Severity::Info, "util.ts", 0.6),
            finding(DebtType::Complexity, Severity::High, "core.ts", 0.8),
        ];
        let plan = synthesize_plan("scan-5", &findings);
        let mut bucketed: Vec<&String> = plan
            .quick_wins
            .iter()
            .chain(plan.strategic_work.iter())
            .chain(plan.deferrable.iter())
            .collect();
        assert_eq!(bucketed.len(), plan.prioritized_tasks.len());
        bucketed.sort();
        bucketed.dedup();
        assert_eq!(bucketed.len(), plan.prioritized_tasks.len());
    }

    #[test]
    fn quick_win_beats_deferrable_for_low_priority_small_tasks() {
        // Info-severity docs task: priority 9 (> 7) but trivial effort and
        // no dependencies, so it lands in quick wins, not deferrable.
        let f = finding(DebtType::HardcodedConfig, Severity::Info, "cfg.ts", 0.9);
        let plan = synthesize_plan("scan-6", &[f]);
        let task = &plan.prioritized_tasks[0];
        assert_eq!(task.priority, 9);
        assert_eq!(plan.quick_wins, vec![task.id.clone()]);
        assert!(plan.deferrable.is_empty());
    }

    #[test]
    fn deferrable_catches_low_priority_heavy_tasks() {
        // god_class at info severity: priority 9, effort large.
        let f = finding(DebtType::GodClass, Severity::Info, "blob.ts", 0.9);
        let plan = synthesize_plan("scan-7", &[f]);
        let task = &plan.prioritized_tasks[0];
        assert_eq!(plan.deferrable, vec![task.id.clone()]);
    }

    #[test]
    fn tasks_sort_by_priority_then_file() {
        let findings = vec![
            finding(DebtType::Complexity, Severity::High, "zz.ts", 0.8),
            finding(DebtType::Complexity, Severity::High, "aa.ts", 0.8),
            finding(DebtType::SecurityIssue, Severity::Critical, "mm.ts", 0.9),
        ];
        let plan = synthesize_plan("scan-8", &findings);
        let order: Vec<(u8, &str)> = plan
            .prioritized_tasks
            .iter()
            .map(|t| (t.priority, t.file_path.as_str()))
            .collect();
        assert_eq!(order, vec![(1, "mm.ts"), (3, "aa.ts"), (3, "zz.ts")]);
    }

    #[test]
    fn each_finding_appears_in_exactly_one_task() {
        let findings = vec![
            finding(DebtType::CodeSmell, Severity::Low, "a.ts", 0.7),
            finding(DebtType::CodeSmell, Severity::Low, "a.ts", 0.8),
            finding(DebtType::Complexity, Severity::High, "a.ts", 0.8),
            finding(DebtType::MissingDocs, Severity::Info, "b.ts", 0.6),
        ];
        let plan = synthesize_plan("scan-9", &findings);
        for f in &findings {
            let owners = plan
                .prioritized_tasks
                .iter()
                .filter(|t| t.related_debt_ids.contains(&f.id))
                .count();
            assert_eq!(owners, 1, "finding {} owned by {owners} tasks", f.id);
        }
    }

    #[test]
    fn suggested_fix_propagates_to_approach() {
        let f = finding(DebtType::Complexity, Severity::High, "x.ts", 0.8)
            .with_suggested_fix("split the dispatch function");
        let plan = synthesize_plan("scan-10", &[f]);
        assert_eq!(
            plan.prioritized_tasks[0].suggested_approach,
            "split the dispatch function"
        );
        let bare = finding(DebtType::Complexity, Severity::High, "x.ts", 0.8);
        let plan = synthesize_plan("scan-11", &[bare]);
        assert_eq!(
            plan.prioritized_tasks[0].suggested_approach,
            DEFAULT_APPROACH
        );
    }
}
