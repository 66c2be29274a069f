use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::payload::{build_prompt, minimize, system_prompt};
use super::validate::{validate, Enrichment, Violation};
use crate::config::IntentConfig;
use crate::intent::CanonicalIntentModel;
use crate::llm_client::{build_llm_client, unwrap_fences, SharedLlmClient};
use crate::pipeline::IntentStore;

pub const ENRICHMENT_VERSION: &str = "v1";
const MAX_ATTEMPTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrichmentStatus {
    Skipped,
    Success,
    LlmConflict,
    LlmError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    EmptyFeature,
    Disabled,
    NoClient,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentOutcome {
    pub status: EnrichmentStatus,
    pub enrichment: Option<Enrichment>,
    pub violations: Vec<Violation>,
    /// Rejected reply kept for audit on `LLM_CONFLICT`.
    pub raw_output: Option<Value>,
    pub error: Option<String>,
    pub skip_reason: Option<SkipReason>,
    pub llm_used: bool,
    /// Served from a prior successful record with the same fingerprint.
    pub reused: bool,
}

impl EnrichmentOutcome {
    fn empty(status: EnrichmentStatus) -> Self {
        Self {
            status,
            enrichment: None,
            violations: Vec::new(),
            raw_output: None,
            error: None,
            skip_reason: None,
            llm_used: false,
            reused: false,
        }
    }

    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            skip_reason: Some(reason),
            ..Self::empty(EnrichmentStatus::Skipped)
        }
    }

    fn success(enrichment: Enrichment, reused: bool) -> Self {
        Self {
            enrichment: Some(enrichment),
            llm_used: !reused,
            reused,
            ..Self::empty(EnrichmentStatus::Success)
        }
    }
}

enum Attempt {
    Valid(Enrichment),
    Invalid { violations: Vec<Violation>, raw: Value },
    Errored(String),
}

impl Attempt {
    fn into_failure(self) -> EnrichmentOutcome {
        match self {
            Attempt::Valid(enrichment) => EnrichmentOutcome::success(enrichment, false),
            Attempt::Invalid { violations, raw } => EnrichmentOutcome {
                violations,
                raw_output: Some(raw),
                llm_used: true,
                ..EnrichmentOutcome::empty(EnrichmentStatus::LlmConflict)
            },
            Attempt::Errored(error) => EnrichmentOutcome {
                error: Some(error),
                llm_used: true,
                ..EnrichmentOutcome::empty(EnrichmentStatus::LlmError)
            },
        }
    }
}

/// Mediates the enrichment call: one attempt plus one retry, every reply
/// validated against the canonical model before it is accepted.
pub struct EnrichmentGuardrail {
    client: Option<SharedLlmClient>,
    enabled: bool,
    timeout: Duration,
}

impl EnrichmentGuardrail {
    pub fn new(client: Option<SharedLlmClient>, enabled: bool, timeout: Duration) -> Self {
        Self {
            client,
            enabled,
            timeout,
        }
    }

    pub fn from_config(config: &IntentConfig) -> Self {
        Self::new(
            build_llm_client(config),
            config.enrichment_enabled,
            config.llm_timeout(),
        )
    }

    pub fn disabled() -> Self {
        Self::new(None, false, Duration::ZERO)
    }

    #[instrument(skip_all, fields(fingerprint = %fingerprint))]
    pub async fn enrich(
        &self,
        model: &CanonicalIntentModel,
        fingerprint: &str,
        store: &dyn IntentStore,
    ) -> anyhow::Result<EnrichmentOutcome> {
        if model.is_empty() {
            return Ok(EnrichmentOutcome::skipped(SkipReason::EmptyFeature));
        }
        if !self.enabled {
            return Ok(EnrichmentOutcome::skipped(SkipReason::Disabled));
        }
        let Some(client) = &self.client else {
            debug!("no enrichment client configured");
            return Ok(EnrichmentOutcome::skipped(SkipReason::NoClient));
        };

        if let Some(prior) = store.find_enriched(fingerprint).await? {
            if let Some(enrichment) = prior.enrichment {
                debug!(feature_id = %prior.feature_id, "reusing enrichment for identical fingerprint");
                return Ok(EnrichmentOutcome::success(enrichment, true));
            }
        }

        let system = system_prompt();
        let prompt = build_prompt(&minimize(model)).context("serializing enrichment payload")?;
        let step_count = model.steps.len();

        let mut attempt = 1;
        loop {
            match self.call_once(client, &system, &prompt, step_count).await {
                Attempt::Valid(mut enrichment) => {
                    enrichment.enrichment_version = Some(ENRICHMENT_VERSION.to_string());
                    info!(attempt, "enrichment accepted");
                    return Ok(EnrichmentOutcome::success(enrichment, false));
                }
                failure if attempt >= MAX_ATTEMPTS => {
                    let outcome = failure.into_failure();
                    warn!(
                        status = ?outcome.status,
                        violations = outcome.violations.len(),
                        error = outcome.error.as_deref().unwrap_or(""),
                        "enrichment escalated"
                    );
                    return Ok(outcome);
                }
                Attempt::Invalid { violations, .. } => {
                    warn!(attempt, violations = ?violations, "enrichment rejected, retrying");
                }
                Attempt::Errored(error) => {
                    warn!(attempt, %error, "enrichment call failed, retrying");
                }
            }
            attempt += 1;
        }
    }

    async fn call_once(
        &self,
        client: &SharedLlmClient,
        system: &str,
        prompt: &str,
        step_count: usize,
    ) -> Attempt {
        let reply = match tokio::time::timeout(self.timeout, client.complete(system, prompt)).await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => return Attempt::Errored(format!("{err:#}")),
            Err(_) => {
                return Attempt::Errored(format!(
                    "enrichment call timed out after {} ms",
                    self.timeout.as_millis()
                ))
            }
        };

        let value: Value = match serde_json::from_str(unwrap_fences(&reply)) {
            Ok(value) => value,
            Err(err) => return Attempt::Errored(format!("reply is not valid JSON: {err}")),
        };

        match validate(step_count, &value) {
            Ok(enrichment) => Attempt::Valid(enrichment),
            Err(violations) => Attempt::Invalid {
                violations,
                raw: value,
            },
        }
    }
}
