//! Analysis configuration with the shipped defaults.

use serde::{Deserialize, Serialize};

use crate::voting::{VoteStrategy, WeightTable};

/// A layering rule: files matching `pattern` sit at `level`. Lower levels
/// are more abstract and must not depend on higher ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerPattern {
    /// Regular expression matched against the file path.
    pub pattern: String,
    pub level: u32,
    pub name: String,
}

/// Tuning knobs for one scan. Unset fields deserialize to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Debate rounds before forced resolution.
    pub max_debate_rounds: u32,
    /// Wall-clock budget per debate, enforced by the phase controller.
    pub debate_timeout_ms: u64,
    /// Critic confidence below which a finding is challenged.
    pub challenge_threshold: f64,
    pub resolution_strategy: VoteStrategy,
    pub max_files_per_batch: usize,
    /// Token budget per file; content beyond it is truncated.
    pub max_tokens_per_file: usize,
    /// Validated findings below this confidence are dropped.
    pub confidence_threshold: f64,
    pub worker_pool_size: usize,
    pub agent_weights: WeightTable,
    pub layer_patterns: Vec<LayerPattern>,
    /// Run the Historian alongside discovery.
    pub historian_enabled: bool,
    /// Route stalled debates and conflicts through the LLM arbiter.
    pub arbiter_enabled: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_debate_rounds: default_max_debate_rounds(),
            debate_timeout_ms: default_debate_timeout_ms(),
            challenge_threshold: default_challenge_threshold(),
            resolution_strategy: VoteStrategy::default(),
            max_files_per_batch: default_max_files_per_batch(),
            max_tokens_per_file: default_max_tokens_per_file(),
            confidence_threshold: default_confidence_threshold(),
            worker_pool_size: default_worker_pool_size(),
            agent_weights: WeightTable::default(),
            layer_patterns: Vec::new(),
            historian_enabled: false,
            arbiter_enabled: false,
        }
    }
}

fn default_max_debate_rounds() -> u32 {
    3
}

fn default_debate_timeout_ms() -> u64 {
    30_000
}

fn default_challenge_threshold() -> f64 {
    0.7
}

fn default_max_files_per_batch() -> usize {
    5
}

fn default_max_tokens_per_file() -> usize {
    8_000
}

fn default_confidence_threshold() -> f64 {
    0.5
}

fn default_worker_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
        .max(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = AnalysisConfig::default();
        assert_eq!(config.max_debate_rounds, 3);
        assert_eq!(config.debate_timeout_ms, 30_000);
        assert!((config.challenge_threshold - 0.7).abs() < f64::EPSILON);
        assert_eq!(config.resolution_strategy, VoteStrategy::Weighted);
        assert_eq!(config.max_files_per_batch, 5);
        assert_eq!(config.max_tokens_per_file, 8_000);
        assert!((config.confidence_threshold - 0.5).abs() < f64::EPSILON);
        assert!(config.worker_pool_size >= 2);
        assert!(!config.historian_enabled);
        assert!(!config.arbiter_enabled);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"max_debate_rounds": 5, "challenge_threshold": 0.9}"#)
                .unwrap();
        assert_eq!(config.max_debate_rounds, 5);
        assert!((config.challenge_threshold - 0.9).abs() < f64::EPSILON);
        assert_eq!(config.max_files_per_batch, 5);
    }
}
