//! The uniform agent runner.
//!
//! One runner drives any discovery agent (Scanner, Architect, Historian)
//! over files; a second drives the Critic over findings. Runners only
//! consume typed tool-calls, accumulate errors instead of aborting, and
//! check the cancellation token between items.

use std::collections::HashMap;
use std::sync::Arc;

use adjudication::bus::SharedMessageBus;
use adjudication::config::AnalysisConfig;
use adjudication::error::AgentError;
use adjudication::finding::{AgentRole, CriticReview, Finding};
use adjudication::message::{AgentMessage, Recipient};
use adjudication::ports::llm::{ChatMessage, CompletionRequest, LlmTransport};
use adjudication::ports::repo::{LogQuery, RepoSnapshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::graph::DependencyAnalyzer;
use crate::retry::{self, RetryPolicy};
use crate::roster::AgentSpec;
use crate::tools;

/// Commits shown to the Historian per file.
const HISTORY_LIMIT: usize = 5;

/// Marker appended to truncated file content.
const TRUNCATION_MARKER: &str = "\n[truncated]";

/// What a discovery agent produced.
#[derive(Debug)]
pub struct RunnerOutcome {
    pub role: AgentRole,
    /// Findings in tool-call parse order.
    pub findings: Vec<Finding>,
    pub errors: Vec<AgentError>,
    pub llm_calls: u32,
}

/// What the critic produced.
#[derive(Debug, Default)]
pub struct CriticOutcome {
    pub reviews: HashMap<String, CriticReview>,
    /// Rejected findings, with the challenge reason and evidence.
    pub challenges: Vec<(Finding, String, Vec<String>)>,
    pub errors: Vec<AgentError>,
    pub llm_calls: u32,
}

/// Estimated token count: one token per four characters, rounded up.
pub fn estimate_tokens(content: &str) -> usize {
    content.chars().count().div_ceil(4)
}

/// Cut content down to the token budget, appending a marker when cut.
pub fn truncate_to_budget(content: &str, max_tokens: usize) -> (String, bool) {
    if estimate_tokens(content) <= max_tokens {
        return (content.to_string(), false);
    }
    let kept: String = content.chars().take(max_tokens * 4).collect();
    (format!("{kept}{TRUNCATION_MARKER}"), true)
}

/// Drives one discovery agent over the file stream.
pub struct DiscoveryRunner {
    spec: AgentSpec,
    transport: Arc<dyn LlmTransport>,
    repo: Arc<dyn RepoSnapshot>,
    config: Arc<AnalysisConfig>,
    bus: SharedMessageBus,
    retry: RetryPolicy,
}

impl DiscoveryRunner {
    pub fn new(
        spec: AgentSpec,
        transport: Arc<dyn LlmTransport>,
        repo: Arc<dyn RepoSnapshot>,
        config: Arc<AnalysisConfig>,
        bus: SharedMessageBus,
    ) -> Self {
        Self {
            spec,
            transport,
            repo,
            config,
            bus,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Process every file. A single item's failure never aborts the run;
    /// an authentication rejection ends it early with partial results.
    pub async fn run(
        &self,
        repo_id: &str,
        files: &[String],
        cancel: &CancellationToken,
    ) -> RunnerOutcome {
        let role = self.spec.role;
        let mut outcome = RunnerOutcome {
            role,
            findings: Vec::new(),
            errors: Vec::new(),
            llm_calls: 0,
        };
        // Sources kept aside for the Architect's structural pass.
        let mut sources: Vec<(String, String)> = Vec::new();

        'files: for batch in files.chunks(self.config.max_files_per_batch.max(1)) {
            for file in batch {
                if cancel.is_cancelled() {
                    break 'files;
                }
                let content = match self.repo.file_content(repo_id, file).await {
                    Ok(content) => content,
                    Err(e) => {
                        outcome.errors.push(AgentError::recoverable(
                            role,
                            Some(file.clone()),
                            format!("failed to read file: {e}"),
                        ));
                        continue;
                    }
                };
                if role == AgentRole::Architect {
                    sources.push((file.clone(), content.clone()));
                }

                let (prompt_content, was_truncated) =
                    truncate_to_budget(&content, self.config.max_tokens_per_file);
                if was_truncated {
                    debug!(file, role = %role, "file content truncated to token budget");
                }

                let user_prompt = if role == AgentRole::Historian {
                    let history = self.history_for(repo_id, file).await;
                    self.spec.prompts.render_user(&[
                        ("file_path", file.as_str()),
                        ("content", prompt_content.as_str()),
                        ("history", history.as_str()),
                    ])
                } else {
                    self.spec.prompts.render_user(&[
                        ("file_path", file.as_str()),
                        ("content", prompt_content.as_str()),
                    ])
                };

                let request = CompletionRequest {
                    model: self.spec.model.clone(),
                    system_prompt: self.spec.prompts.system.clone(),
                    messages: vec![ChatMessage::user(user_prompt)],
                    temperature: self.spec.temperature,
                    max_tokens: self.spec.max_tokens,
                    tools: self.spec.tools.clone(),
                };

                let response = match retry::with_retry(self.retry, cancel, || {
                    self.transport.complete(request.clone())
                })
                .await
                {
                    Ok(response) => response,
                    Err(e) if e.is_fatal_for_agent() => {
                        warn!(role = %role, error = %e, "fatal transport error, ending agent run");
                        outcome
                            .errors
                            .push(AgentError::fatal(role, format!("transport rejected agent: {e}")));
                        break 'files;
                    }
                    Err(e) => {
                        outcome.errors.push(AgentError::recoverable(
                            role,
                            Some(file.clone()),
                            format!("completion failed: {e}"),
                        ));
                        continue;
                    }
                };
                outcome.llm_calls += 1;

                for call in &response.tool_calls {
                    if call.name != tools::REPORT_DEBT {
                        continue;
                    }
                    match tools::finding_from_report(call, file, Some(&content)) {
                        Some(finding) => self.emit(&mut outcome, finding),
                        None => outcome.errors.push(AgentError {
                            agent: role,
                            item: Some(file.clone()),
                            message: "report_debt arguments failed validation".into(),
                            recoverable: false,
                        }),
                    }
                }
            }
        }

        if role == AgentRole::Architect && !cancel.is_cancelled() {
            let analyzer = DependencyAnalyzer::new(&self.config.layer_patterns);
            for finding in analyzer.analyze(&sources) {
                self.emit(&mut outcome, finding);
            }
        }

        info!(
            role = %role,
            findings = outcome.findings.len(),
            errors = outcome.errors.len(),
            llm_calls = outcome.llm_calls,
            "discovery run finished"
        );
        outcome
    }

    fn emit(&self, outcome: &mut RunnerOutcome, finding: Finding) {
        self.bus
            .publish(AgentMessage::finding(self.spec.role, finding.clone()));
        outcome.findings.push(finding);
    }

    async fn history_for(&self, repo_id: &str, file: &str) -> String {
        let query = LogQuery {
            file: Some(file.to_string()),
            limit: Some(HISTORY_LIMIT),
        };
        match self.repo.log(repo_id, query).await {
            Ok(commits) => commits
                .iter()
                .map(|c| format!("{} {} {}: {}", c.sha, c.date.date_naive(), c.author, c.message))
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => {
                debug!(file, error = %e, "history unavailable");
                String::new()
            }
        }
    }
}

/// Drives the Critic over the discovery findings.
pub struct CriticRunner {
    spec: AgentSpec,
    transport: Arc<dyn LlmTransport>,
    config: Arc<AnalysisConfig>,
    bus: SharedMessageBus,
    retry: RetryPolicy,
}

impl CriticRunner {
    pub fn new(
        spec: AgentSpec,
        transport: Arc<dyn LlmTransport>,
        config: Arc<AnalysisConfig>,
        bus: SharedMessageBus,
    ) -> Self {
        Self {
            spec,
            transport,
            config,
            bus,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Review each finding. A finding is accepted only when the critic
    /// validates it at or above the challenge threshold; anything else
    /// becomes a broadcast challenge that seeds a debate.
    pub async fn run(&self, findings: &[Finding], cancel: &CancellationToken) -> CriticOutcome {
        let role = self.spec.role;
        let mut outcome = CriticOutcome::default();

        for finding in findings {
            if cancel.is_cancelled() {
                break;
            }
            let serialized = match serde_json::to_string_pretty(finding) {
                Ok(serialized) => serialized,
                Err(e) => {
                    outcome.errors.push(AgentError::recoverable(
                        role,
                        Some(finding.id.clone()),
                        format!("finding serialization failed: {e}"),
                    ));
                    continue;
                }
            };
            let request = CompletionRequest {
                model: self.spec.model.clone(),
                system_prompt: self.spec.prompts.system.clone(),
                messages: vec![ChatMessage::user(
                    self.spec.prompts.render_user(&[("finding", serialized.as_str())]),
                )],
                temperature: self.spec.temperature,
                max_tokens: self.spec.max_tokens,
                tools: self.spec.tools.clone(),
            };

            let response = match retry::with_retry(self.retry, cancel, || {
                self.transport.complete(request.clone())
            })
            .await
            {
                Ok(response) => response,
                Err(e) if e.is_fatal_for_agent() => {
                    outcome
                        .errors
                        .push(AgentError::fatal(role, format!("transport rejected agent: {e}")));
                    break;
                }
                Err(e) => {
                    outcome.errors.push(AgentError::recoverable(
                        role,
                        Some(finding.id.clone()),
                        format!("completion failed: {e}"),
                    ));
                    continue;
                }
            };
            outcome.llm_calls += 1;

            let Some(review) = response
                .tool_calls
                .iter()
                .find_map(|call| tools::review_from_call(call, &finding.id))
            else {
                outcome.errors.push(AgentError {
                    agent: role,
                    item: Some(finding.id.clone()),
                    message: "critic produced no usable tool-call".into(),
                    recoverable: false,
                });
                continue;
            };

            let review = self.apply_threshold(review);
            if !review.accepted {
                debug!(finding_id = %finding.id, reason = %review.reason, "critic challenge");
                self.bus.publish(AgentMessage::challenge(
                    role,
                    Recipient::Broadcast,
                    finding.clone(),
                    review.reason.clone(),
                    vec![],
                ));
                outcome
                    .challenges
                    .push((finding.clone(), review.reason.clone(), vec![]));
            }
            outcome.reviews.insert(finding.id.clone(), review);
        }

        info!(
            reviews = outcome.reviews.len(),
            challenges = outcome.challenges.len(),
            errors = outcome.errors.len(),
            "critic run finished"
        );
        outcome
    }

    /// A validation below the challenge threshold is still a rejection.
    fn apply_threshold(&self, review: CriticReview) -> CriticReview {
        if review.accepted && review.confidence < self.config.challenge_threshold {
            CriticReview {
                accepted: false,
                reason: format!(
                    "confidence {:.2} below challenge threshold {:.2}",
                    review.confidence, self.config.challenge_threshold
                ),
                ..review
            }
        } else {
            review
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adjudication::bus::MessageBus;
    use adjudication::finding::{DebtType, Severity};
    use adjudication::message::MessageType;
    use adjudication::ports::llm::{
        CompletionResponse, FinishReason, StreamItem, TokenUsage, ToolCall, TransportError,
        TransportResult,
    };
    use adjudication::ports::repo::{BlameEntry, CommitInfo, RepoError, RepoResult};
    use async_trait::async_trait;
    use futures::stream::BoxStream;
    use serde_json::json;
    use std::collections::HashMap as StdHashMap;
    use std::sync::Mutex;

    use crate::roster::Roster;

    /// Transport returning queued responses in order.
    struct ScriptedTransport {
        responses: Mutex<Vec<TransportResult<CompletionResponse>>>,
    }

    impl ScriptedTransport {
        fn new(mut responses: Vec<TransportResult<CompletionResponse>>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
            }
        }

        fn tool_response(calls: Vec<ToolCall>) -> CompletionResponse {
            CompletionResponse {
                content: String::new(),
                tool_calls: calls,
                usage: TokenUsage::default(),
                finish_reason: FinishReason::ToolCalls,
            }
        }
    }

    #[async_trait]
    impl LlmTransport for ScriptedTransport {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> TransportResult<CompletionResponse> {
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(Self::tool_response(vec![])))
        }

        async fn complete_structured(
            &self,
            _request: CompletionRequest,
            _schema: serde_json::Value,
        ) -> TransportResult<serde_json::Value> {
            Err(TransportError::InvalidResponse("not scripted".into()))
        }

        async fn stream(
            &self,
            _request: CompletionRequest,
        ) -> TransportResult<BoxStream<'static, TransportResult<StreamItem>>> {
            Err(TransportError::InvalidResponse("not scripted".into()))
        }
    }

    /// In-memory snapshot of a repository.
    struct StaticRepo {
        files: StdHashMap<String, String>,
    }

    impl StaticRepo {
        fn new(files: &[(&str, &str)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(p, c)| (p.to_string(), c.to_string()))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl RepoSnapshot for StaticRepo {
        async fn list_files(&self, _repo_id: &str) -> RepoResult<Vec<String>> {
            let mut files: Vec<String> = self.files.keys().cloned().collect();
            files.sort();
            Ok(files)
        }

        async fn file_content(&self, _repo_id: &str, path: &str) -> RepoResult<String> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| RepoError::NotFound(path.to_string()))
        }

        async fn log(&self, _repo_id: &str, _query: LogQuery) -> RepoResult<Vec<CommitInfo>> {
            Ok(vec![])
        }

        async fn blame(
            &self,
            _repo_id: &str,
            _path: &str,
            _start: u32,
            _end: u32,
        ) -> RepoResult<Vec<BlameEntry>> {
            Ok(vec![])
        }

        async fn diff(&self, _repo_id: &str, _sha: &str) -> RepoResult<String> {
            Ok(String::new())
        }

        async fn default_branch(&self, _repo_id: &str) -> RepoResult<String> {
            Ok("main".into())
        }
    }

    fn report_call(debt_type: &str, confidence: f64) -> ToolCall {
        ToolCall {
            name: tools::REPORT_DEBT.into(),
            args: json!({
                "debt_type": debt_type,
                "severity": "medium",
                "confidence": confidence,
                "title": format!("{debt_type} spotted"),
                "description": "details",
                "start_line": 1,
                "end_line": 2,
            }),
        }
    }

    fn scanner_runner(
        transport: ScriptedTransport,
        repo: StaticRepo,
    ) -> (DiscoveryRunner, SharedMessageBus) {
        let bus = MessageBus::new().shared();
        let spec = Roster::standard("m").get(AgentRole::Scanner).unwrap().clone();
        let runner = DiscoveryRunner::new(
            spec,
            Arc::new(transport),
            Arc::new(repo),
            Arc::new(AnalysisConfig::default()),
            bus.clone(),
        );
        (runner, bus)
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn truncation_appends_marker() {
        let long = "x".repeat(100);
        let (kept, truncated) = truncate_to_budget(&long, 10);
        assert!(truncated);
        assert!(kept.ends_with(TRUNCATION_MARKER));
        assert!(kept.starts_with(&"x".repeat(40)));

        let (same, truncated) = truncate_to_budget("short", 10);
        assert!(!truncated);
        assert_eq!(same, "short");
    }

    #[tokio::test]
    async fn findings_are_collected_and_published_in_order() {
        let transport = ScriptedTransport::new(vec![Ok(ScriptedTransport::tool_response(vec![
            report_call("code_smell", 0.8),
            report_call("duplication", 0.7),
        ]))]);
        let repo = StaticRepo::new(&[("a.ts", "line1\nline2\nline3")]);
        let (runner, bus) = scanner_runner(transport, repo);

        let outcome = runner
            .run("repo-1", &["a.ts".into()], &CancellationToken::new())
            .await;
        assert_eq!(outcome.findings.len(), 2);
        assert_eq!(outcome.findings[0].debt_type, DebtType::CodeSmell);
        assert_eq!(outcome.findings[1].debt_type, DebtType::Duplication);
        assert!(outcome.errors.is_empty());
        assert_eq!(bus.len(), 2);
    }

    #[tokio::test]
    async fn transport_failure_is_recoverable_per_item() {
        let transport = ScriptedTransport::new(vec![
            Err(TransportError::InvalidResponse("garbage".into())),
            Ok(ScriptedTransport::tool_response(vec![report_call(
                "code_smell",
                0.8,
            )])),
        ]);
        let repo = StaticRepo::new(&[("a.ts", "aaa"), ("b.ts", "bbb")]);
        let (runner, _bus) = scanner_runner(transport, repo);

        let outcome = runner
            .run(
                "repo-1",
                &["a.ts".into(), "b.ts".into()],
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(outcome.findings.len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].recoverable);
    }

    #[tokio::test]
    async fn auth_failure_ends_run_with_partial_results() {
        let transport = ScriptedTransport::new(vec![
            Ok(ScriptedTransport::tool_response(vec![report_call(
                "code_smell",
                0.8,
            )])),
            Err(TransportError::Auth("401".into())),
        ]);
        let repo = StaticRepo::new(&[("a.ts", "aaa"), ("b.ts", "bbb"), ("c.ts", "ccc")]);
        let (runner, _bus) = scanner_runner(transport, repo);

        let outcome = runner
            .run(
                "repo-1",
                &["a.ts".into(), "b.ts".into(), "c.ts".into()],
                &CancellationToken::new(),
            )
            .await;
        // First file produced a finding, second hit the auth wall, third
        // was never attempted.
        assert_eq!(outcome.findings.len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert!(!outcome.errors[0].recoverable);
        assert_eq!(outcome.llm_calls, 1);
    }

    #[tokio::test]
    async fn malformed_tool_call_records_schema_error() {
        let bad_call = ToolCall {
            name: tools::REPORT_DEBT.into(),
            args: json!({"debt_type": "code_smell", "confidence": 3.0}),
        };
        let transport =
            ScriptedTransport::new(vec![Ok(ScriptedTransport::tool_response(vec![bad_call]))]);
        let repo = StaticRepo::new(&[("a.ts", "aaa")]);
        let (runner, _bus) = scanner_runner(transport, repo);

        let outcome = runner
            .run("repo-1", &["a.ts".into()], &CancellationToken::new())
            .await;
        assert!(outcome.findings.is_empty());
        assert_eq!(outcome.errors.len(), 1);
        assert!(!outcome.errors[0].recoverable);
    }

    #[tokio::test]
    async fn architect_emits_graph_findings_without_llm_help() {
        let transport = ScriptedTransport::new(vec![
            Ok(ScriptedTransport::tool_response(vec![])),
            Ok(ScriptedTransport::tool_response(vec![])),
        ]);
        let repo = StaticRepo::new(&[
            ("a.ts", "import { b } from './b';"),
            ("b.ts", "import { a } from './a';"),
        ]);
        let bus = MessageBus::new().shared();
        let spec = Roster::standard("m").get(AgentRole::Architect).unwrap().clone();
        let runner = DiscoveryRunner::new(
            spec,
            Arc::new(transport),
            Arc::new(repo),
            Arc::new(AnalysisConfig::default()),
            bus.clone(),
        );

        let outcome = runner
            .run(
                "repo-1",
                &["a.ts".into(), "b.ts".into()],
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(outcome.findings.len(), 1);
        assert_eq!(outcome.findings[0].debt_type, DebtType::CircularDependency);
        assert!((outcome.findings[0].confidence - 0.95).abs() < 1e-9);
    }

    #[tokio::test]
    async fn cancellation_stops_between_items() {
        let transport = ScriptedTransport::new(vec![]);
        let repo = StaticRepo::new(&[("a.ts", "aaa")]);
        let (runner, _bus) = scanner_runner(transport, repo);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = runner.run("repo-1", &["a.ts".into()], &cancel).await;
        assert!(outcome.findings.is_empty());
        assert_eq!(outcome.llm_calls, 0);
    }

    fn critic_runner(
        transport: ScriptedTransport,
        bus: SharedMessageBus,
    ) -> CriticRunner {
        let spec = Roster::standard("m").get(AgentRole::Critic).unwrap().clone();
        CriticRunner::new(
            spec,
            Arc::new(transport),
            Arc::new(AnalysisConfig::default()),
            bus,
        )
    }

    fn sample_finding(confidence: f64) -> Finding {
        Finding::new(
            DebtType::CodeSmell,
            Severity::Low,
            confidence,
            "long function",
            "spans three screens",
            "a.ts",
            None,
            None,
        )
    }

    #[tokio::test]
    async fn validated_finding_above_threshold_is_accepted() {
        let finding = sample_finding(0.8);
        let call = ToolCall {
            name: tools::VALIDATE_FINDING.into(),
            args: json!({"finding_id": finding.id, "confidence": 0.9}),
        };
        let transport =
            ScriptedTransport::new(vec![Ok(ScriptedTransport::tool_response(vec![call]))]);
        let bus = MessageBus::new().shared();
        let critic = critic_runner(transport, bus.clone());

        let outcome = critic
            .run(std::slice::from_ref(&finding), &CancellationToken::new())
            .await;
        let review = outcome.reviews.get(&finding.id).unwrap();
        assert!(review.accepted);
        assert!(outcome.challenges.is_empty());
        assert_eq!(bus.len(), 0);
    }

    #[tokio::test]
    async fn low_confidence_validation_becomes_challenge() {
        let finding = sample_finding(0.4);
        let call = ToolCall {
            name: tools::VALIDATE_FINDING.into(),
            args: json!({"finding_id": finding.id, "confidence": 0.4}),
        };
        let transport =
            ScriptedTransport::new(vec![Ok(ScriptedTransport::tool_response(vec![call]))]);
        let bus = MessageBus::new().shared();
        let critic = critic_runner(transport, bus.clone());

        let outcome = critic
            .run(std::slice::from_ref(&finding), &CancellationToken::new())
            .await;
        let review = outcome.reviews.get(&finding.id).unwrap();
        assert!(!review.accepted);
        assert!(review.reason.contains("below challenge threshold"));
        assert_eq!(outcome.challenges.len(), 1);
        // The challenge went out as a broadcast.
        let published = bus.get_messages(&adjudication::bus::MessageFilter::new());
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].msg_type, MessageType::Challenge);
    }

    #[tokio::test]
    async fn explicit_rejection_becomes_challenge() {
        let finding = sample_finding(0.9);
        let call = ToolCall {
            name: tools::REJECT_FINDING.into(),
            args: json!({"finding_id": finding.id, "reason": "not actually dead code"}),
        };
        let transport =
            ScriptedTransport::new(vec![Ok(ScriptedTransport::tool_response(vec![call]))]);
        let bus = MessageBus::new().shared();
        let critic = critic_runner(transport, bus);

        let outcome = critic
            .run(std::slice::from_ref(&finding), &CancellationToken::new())
            .await;
        assert_eq!(outcome.challenges.len(), 1);
        assert_eq!(outcome.challenges[0].1, "not actually dead code");
    }

    #[tokio::test]
    async fn missing_tool_call_is_a_schema_error_not_a_review() {
        let finding = sample_finding(0.9);
        let transport =
            ScriptedTransport::new(vec![Ok(ScriptedTransport::tool_response(vec![]))]);
        let bus = MessageBus::new().shared();
        let critic = critic_runner(transport, bus);

        let outcome = critic
            .run(std::slice::from_ref(&finding), &CancellationToken::new())
            .await;
        assert!(outcome.reviews.is_empty());
        assert_eq!(outcome.errors.len(), 1);
    }
}
