//! Property-based invariants over the adjudication core.

use std::collections::BTreeMap;

use proptest::prelude::*;

use adjudication::conflict::{detect_between, detect_conflicts, merge_findings};
use adjudication::finding::{AgentRole, DebtType, Finding, Severity, Span};
use adjudication::identity;
use adjudication::plan::synthesize_plan;
use adjudication::voting::{self, VoteStrategy, WeightTable};

fn arb_debt_type() -> impl Strategy<Value = DebtType> {
    prop_oneof![
        Just(DebtType::CodeSmell),
        Just(DebtType::Complexity),
        Just(DebtType::Duplication),
        Just(DebtType::DeadCode),
        Just(DebtType::MissingTests),
        Just(DebtType::GodClass),
        Just(DebtType::FeatureEnvy),
        Just(DebtType::SecurityIssue),
        Just(DebtType::HardcodedConfig),
        Just(DebtType::MissingDocs),
    ]
}

fn arb_severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Info),
        Just(Severity::Low),
        Just(Severity::Medium),
        Just(Severity::High),
        Just(Severity::Critical),
    ]
}

fn arb_span() -> impl Strategy<Value = Option<Span>> {
    prop_oneof![
        Just(None),
        (1u32..200, 0u32..100).prop_map(|(start, extra)| Span::new(start, start + extra)),
    ]
}

prop_compose! {
    fn arb_finding()(
        debt_type in arb_debt_type(),
        severity in arb_severity(),
        confidence in 0.0f64..=1.0,
        file_index in 0usize..4,
        span in arb_span(),
        evidence in proptest::collection::btree_set("[a-z]{1,12}", 0..4),
    ) -> Finding {
        let files = ["a.ts", "b.ts", "src/core.ts", "src/util.ts"];
        Finding::new(
            debt_type,
            severity,
            confidence,
            format!("{debt_type} in {}", files[file_index]),
            "generated finding",
            files[file_index],
            span,
            None,
        )
        .with_evidence(evidence.into_iter().collect())
    }
}

proptest! {
    #[test]
    fn merge_identical_findings_is_identity_up_to_id(finding in arb_finding()) {
        let merged = merge_findings(&finding, &finding);
        prop_assert_eq!(merged.debt_type, finding.debt_type);
        prop_assert_eq!(merged.severity, finding.severity);
        prop_assert!((merged.confidence - finding.confidence).abs() < 1e-9);
        prop_assert_eq!(merged.span, finding.span);
        prop_assert_eq!(&merged.file_path, &finding.file_path);
        prop_assert_eq!(&merged.evidence, &finding.evidence);
        prop_assert_eq!(&merged.description, &finding.description);
        prop_assert_ne!(&merged.id, &finding.id);
    }

    #[test]
    fn conflict_detection_is_symmetric(
        scanner in proptest::collection::vec(arb_finding(), 0..6),
        architect in proptest::collection::vec(arb_finding(), 0..6),
    ) {
        let forward = detect_conflicts(&scanner, &architect);
        let reverse = detect_between(
            (AgentRole::Architect, &architect),
            (AgentRole::Scanner, &scanner),
        );
        prop_assert_eq!(forward.len(), reverse.len());
        let mut forward_types: Vec<String> =
            forward.iter().map(|c| c.conflict_type.to_string()).collect();
        let mut reverse_types: Vec<String> =
            reverse.iter().map(|c| c.conflict_type.to_string()).collect();
        forward_types.sort();
        reverse_types.sort();
        prop_assert_eq!(forward_types, reverse_types);
    }

    #[test]
    fn flipping_any_no_vote_never_decreases_acceptance(
        votes in proptest::collection::btree_map(
            prop_oneof![
                Just(AgentRole::Scanner),
                Just(AgentRole::Architect),
                Just(AgentRole::Historian),
                Just(AgentRole::Critic),
                Just(AgentRole::Planner),
            ],
            any::<bool>(),
            1..5,
        ),
        debt_type in arb_debt_type(),
    ) {
        let table = WeightTable::default();
        for strategy in [
            VoteStrategy::Majority,
            VoteStrategy::Weighted,
            VoteStrategy::Unanimous,
        ] {
            let before = voting::tally(&votes, strategy, debt_type, &table);
            for (role, vote) in &votes {
                if !vote {
                    let mut flipped: BTreeMap<AgentRole, bool> = votes.clone();
                    flipped.insert(*role, true);
                    let after = voting::tally(&flipped, strategy, debt_type, &table);
                    prop_assert!(after.score >= before.score);
                    prop_assert!(after.accepted || !before.accepted);
                }
            }
        }
    }

    #[test]
    fn plan_buckets_partition_tasks(
        findings in proptest::collection::vec(arb_finding(), 0..12),
    ) {
        let plan = synthesize_plan("prop-scan", &findings);
        let total = plan.prioritized_tasks.len();
        let mut ids: Vec<&String> = plan
            .quick_wins
            .iter()
            .chain(plan.strategic_work.iter())
            .chain(plan.deferrable.iter())
            .collect();
        prop_assert_eq!(ids.len(), total);
        ids.sort();
        ids.dedup();
        prop_assert_eq!(ids.len(), total);
        for id in ids {
            prop_assert!(plan.prioritized_tasks.iter().any(|t| &t.id == id));
        }
    }

    #[test]
    fn each_finding_owned_by_exactly_one_task(
        findings in proptest::collection::vec(arb_finding(), 0..12),
    ) {
        let plan = synthesize_plan("prop-scan", &findings);
        for finding in &findings {
            let owners = plan
                .prioritized_tasks
                .iter()
                .filter(|t| t.related_debt_ids.contains(&finding.id))
                .count();
            prop_assert_eq!(owners, 1);
        }
    }

    #[test]
    fn fingerprint_ignores_non_identity_fields(
        debt_type in arb_debt_type(),
        title in "[a-z ]{1,30}",
        body in "[a-z\n ]{0,80}",
    ) {
        let with_span = identity::fingerprint(debt_type, "a.ts", Some(&body), &title);
        let again = identity::fingerprint(debt_type, "a.ts", Some(&body), "another title");
        prop_assert_eq!(with_span, again);
    }
}
