use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::extract::DEFAULT_MAX_EXPANSION_DEPTH;
use crate::intent::DEFAULT_EXTRACTION_VERSION;

#[derive(Debug, Clone)]
pub struct IntentConfig {
    pub enrichment_enabled: bool,
    pub llm_model: String,
    pub llm_timeout_ms: u64,
    pub llm_seed: i64,
    pub max_expansion_depth: usize,
    pub max_parallel_features: usize,
    pub store_dir: PathBuf,
    pub extraction_version: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            enrichment_enabled: true,
            llm_model: Self::DEFAULT_MODEL.to_string(),
            llm_timeout_ms: 30_000,
            llm_seed: 7,
            max_expansion_depth: DEFAULT_MAX_EXPANSION_DEPTH,
            max_parallel_features: 4,
            store_dir: PathBuf::from(".intent-store"),
            extraction_version: DEFAULT_EXTRACTION_VERSION.to_string(),
            openai_api_key: None,
            openai_base_url: None,
        }
    }
}

impl IntentConfig {
    const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    const ENRICHMENT_VARS: [&'static str; 1] = ["INTENT_ENRICHMENT_ENABLED"];
    const MODEL_VARS: [&'static str; 2] = ["INTENT_LLM_MODEL", "OPENAI_MODEL"];
    const TIMEOUT_VARS: [&'static str; 1] = ["INTENT_LLM_TIMEOUT_MS"];
    const SEED_VARS: [&'static str; 1] = ["INTENT_LLM_SEED"];
    const DEPTH_VARS: [&'static str; 1] = ["INTENT_MAX_EXPANSION_DEPTH"];
    const PARALLEL_VARS: [&'static str; 1] = ["INTENT_MAX_PARALLEL_FEATURES"];
    const STORE_DIR_VARS: [&'static str; 1] = ["INTENT_STORE_DIR"];
    const VERSION_VARS: [&'static str; 1] = ["INTENT_EXTRACTION_VERSION"];
    const API_KEY_VARS: [&'static str; 2] = ["OPENAI_API_KEY", "INTENT_OPENAI_API_KEY"];
    const BASE_URL_VARS: [&'static str; 2] = ["OPENAI_BASE_URL", "INTENT_OPENAI_BASE_URL"];

    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let enrichment_enabled = read_env(&Self::ENRICHMENT_VARS)
            .and_then(|value| parse_flag(&value))
            .unwrap_or(defaults.enrichment_enabled);
        let llm_timeout_ms = read_env(&Self::TIMEOUT_VARS)
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(defaults.llm_timeout_ms);
        let llm_seed = read_env(&Self::SEED_VARS)
            .and_then(|value| value.parse::<i64>().ok())
            .unwrap_or(defaults.llm_seed);
        let max_expansion_depth = read_env(&Self::DEPTH_VARS)
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(defaults.max_expansion_depth);
        let max_parallel_features = read_env(&Self::PARALLEL_VARS)
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_parallel_features);

        Ok(Self {
            enrichment_enabled,
            llm_model: read_env(&Self::MODEL_VARS).unwrap_or(defaults.llm_model),
            llm_timeout_ms,
            llm_seed,
            max_expansion_depth,
            max_parallel_features,
            store_dir: read_env(&Self::STORE_DIR_VARS)
                .map(PathBuf::from)
                .unwrap_or(defaults.store_dir),
            extraction_version: read_env(&Self::VERSION_VARS)
                .unwrap_or(defaults.extraction_version),
            openai_api_key: read_env(&Self::API_KEY_VARS),
            openai_base_url: read_env(&Self::BASE_URL_VARS),
        })
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_millis(self.llm_timeout_ms)
    }

    /// Enrichment needs both the switch and a credential.
    pub fn enrichment_available(&self) -> bool {
        self.enrichment_enabled && self.openai_api_key.is_some()
    }
}

/// First candidate that is set to a non-blank value.
pub(crate) fn read_env(candidates: &[&'static str]) -> Option<String> {
    candidates.iter().find_map(|key| {
        env::var(key)
            .ok()
            .filter(|value| !value.trim().is_empty())
    })
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = IntentConfig::default();
        assert!(config.enrichment_enabled);
        assert_eq!(config.llm_model, "gpt-4o-mini");
        assert_eq!(config.llm_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_expansion_depth, 5);
        assert_eq!(config.max_parallel_features, 4);
        assert_eq!(config.extraction_version, "v1");
        assert!(!config.enrichment_available());
    }

    #[test]
    fn blank_candidates_fall_through_to_the_next_one() {
        env::set_var("INTENT_LENS_TEST_KEY_PRIMARY", "  ");
        env::set_var("INTENT_LENS_TEST_KEY_FALLBACK", "sk-fallback");
        let value = read_env(&[
            "INTENT_LENS_TEST_KEY_PRIMARY",
            "INTENT_LENS_TEST_KEY_FALLBACK",
        ]);
        assert_eq!(value.as_deref(), Some("sk-fallback"));
        assert_eq!(read_env(&["INTENT_LENS_TEST_KEY_PRIMARY"]), None);
        env::remove_var("INTENT_LENS_TEST_KEY_PRIMARY");
        env::remove_var("INTENT_LENS_TEST_KEY_FALLBACK");
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
