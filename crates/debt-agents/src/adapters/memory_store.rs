//! In-memory store and temporal recorder.
//!
//! Default sink for local runs and tests. Honors the same idempotence
//! contracts an external store must: findings keyed by id, plans by scan,
//! occurrences by (fingerprint, scan).

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use adjudication::finding::Finding;
use adjudication::plan::RemediationPlan;
use adjudication::ports::store::{
    DebtOccurrence, FindingStore, StoreResult, TemporalRecorder,
};
use async_trait::async_trait;

#[derive(Default)]
struct StoreState {
    findings: BTreeMap<String, Finding>,
    plans: BTreeMap<String, RemediationPlan>,
    occurrences: Vec<DebtOccurrence>,
    occurrence_keys: HashSet<(String, String)>,
}

/// Keeps everything a scan persists, in memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn findings(&self) -> Vec<Finding> {
        let state = self.state.lock().expect("store lock poisoned");
        state.findings.values().cloned().collect()
    }

    pub fn plan_for(&self, scan_id: &str) -> Option<RemediationPlan> {
        let state = self.state.lock().expect("store lock poisoned");
        state.plans.get(scan_id).cloned()
    }

    pub fn occurrences(&self) -> Vec<DebtOccurrence> {
        let state = self.state.lock().expect("store lock poisoned");
        state.occurrences.clone()
    }
}

#[async_trait]
impl FindingStore for MemoryStore {
    async fn upsert_finding(&self, finding: &Finding) -> StoreResult<()> {
        let mut state = self.state.lock().expect("store lock poisoned");
        state.findings.insert(finding.id.clone(), finding.clone());
        Ok(())
    }

    async fn insert_plan(&self, scan_id: &str, plan: &RemediationPlan) -> StoreResult<()> {
        let mut state = self.state.lock().expect("store lock poisoned");
        state
            .plans
            .entry(scan_id.to_string())
            .or_insert_with(|| plan.clone());
        Ok(())
    }
}

#[async_trait]
impl TemporalRecorder for MemoryStore {
    async fn record(&self, occurrence: DebtOccurrence) -> StoreResult<()> {
        let mut state = self.state.lock().expect("store lock poisoned");
        let key = (occurrence.fingerprint.clone(), occurrence.scan_id.clone());
        if state.occurrence_keys.insert(key) {
            state.occurrences.push(occurrence);
        }
        Ok(())
    }
}
