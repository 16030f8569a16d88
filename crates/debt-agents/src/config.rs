//! Pipeline settings: TOML file plus `DEBT_AGENTS_*` environment overrides.

use std::path::Path;

use adjudication::config::AnalysisConfig;
use anyhow::{Context, Result};
use serde::Deserialize;

/// Endpoint configuration for the LLM transport.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Base URL of an OpenAI-compatible endpoint.
    pub url: String,
    pub api_key: String,
    pub model: String,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            url: std::env::var("DEBT_AGENTS_LLM_URL")
                .unwrap_or_else(|_| "http://localhost:8080/v1".into()),
            api_key: std::env::var("DEBT_AGENTS_API_KEY").unwrap_or_else(|_| "not-needed".into()),
            model: std::env::var("DEBT_AGENTS_MODEL").unwrap_or_else(|_| "qwen2.5-coder".into()),
        }
    }
}

/// Everything the CLI needs to run a scan.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub analysis: AnalysisConfig,
    pub llm: LlmSettings,
}

impl PipelineSettings {
    /// Load from a TOML file when given, defaults otherwise, then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Self::default(),
        };
        settings.apply_env();
        Ok(settings)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("DEBT_AGENTS_LLM_URL") {
            self.llm.url = url;
        }
        if let Ok(key) = std::env::var("DEBT_AGENTS_API_KEY") {
            self.llm.api_key = key;
        }
        if let Ok(model) = std::env::var("DEBT_AGENTS_MODEL") {
            self.llm.model = model;
        }
        if let Ok(v) = std::env::var("DEBT_AGENTS_HISTORIAN") {
            self.analysis.historian_enabled = v == "1" || v.eq_ignore_ascii_case("true");
        }
        if let Ok(v) = std::env::var("DEBT_AGENTS_ARBITER") {
            self.analysis.arbiter_enabled = v == "1" || v.eq_ignore_ascii_case("true");
        }
    }
}
