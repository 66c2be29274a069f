use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::enrich::{Enrichment, EnrichmentOutcome, EnrichmentStatus, Violation};
use crate::intent::{CanonicalIntentModel, RawFactModel};

/// Persisted result of one `process_feature` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureIntentRecord {
    pub session_id: String,
    pub feature_id: String,
    pub raw_model: RawFactModel,
    pub canonical_model: CanonicalIntentModel,
    pub fingerprint: String,
    #[serde(default)]
    pub enrichment: Option<Enrichment>,
    pub enrichment_status: EnrichmentStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_llm_output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub extraction_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment_version: Option<String>,
    pub llm_used: bool,
    #[serde(default)]
    pub source_digests: Vec<SourceDigest>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDigest {
    pub path: String,
    pub blake3: String,
}

impl SourceDigest {
    pub fn of(path: &Path, contents: &[u8]) -> Self {
        Self {
            path: path.display().to_string(),
            blake3: blake3::hash(contents).to_hex().to_string(),
        }
    }
}

impl FeatureIntentRecord {
    pub fn new(
        session_id: &str,
        feature_id: &str,
        raw_model: RawFactModel,
        canonical_model: CanonicalIntentModel,
        fingerprint: String,
    ) -> Self {
        let now = Utc::now();
        let extraction_version = canonical_model.extraction_version.clone();
        Self {
            session_id: session_id.to_string(),
            feature_id: feature_id.to_string(),
            raw_model,
            canonical_model,
            fingerprint,
            enrichment: None,
            enrichment_status: EnrichmentStatus::Skipped,
            violations: Vec::new(),
            raw_llm_output: None,
            error: None,
            extraction_version,
            enrichment_version: None,
            llm_used: false,
            source_digests: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_enrichment(&mut self, outcome: EnrichmentOutcome) {
        self.enrichment_version = outcome
            .enrichment
            .as_ref()
            .and_then(|e| e.enrichment_version.clone());
        self.enrichment = outcome.enrichment;
        self.enrichment_status = outcome.status;
        self.violations = outcome.violations;
        self.raw_llm_output = outcome.raw_output;
        self.error = outcome.error;
        self.llm_used = outcome.llm_used;
    }

    fn is_enriched(&self) -> bool {
        self.enrichment_status == EnrichmentStatus::Success && self.enrichment.is_some()
    }
}

#[async_trait]
pub trait IntentStore: Send + Sync {
    /// Insert or overwrite the record for `record.feature_id`, keeping the
    /// first `created_at`.
    async fn upsert(&self, record: FeatureIntentRecord) -> anyhow::Result<()>;
    async fn get(&self, feature_id: &str) -> anyhow::Result<Option<FeatureIntentRecord>>;
    /// Drop the record for `feature_id`; `true` when one existed.
    async fn remove(&self, feature_id: &str) -> anyhow::Result<bool>;
    /// A prior successful enrichment for the same canonical fingerprint.
    async fn find_enriched(&self, fingerprint: &str)
        -> anyhow::Result<Option<FeatureIntentRecord>>;
}

pub type SharedIntentStore = Arc<dyn IntentStore>;

#[derive(Default)]
pub struct MemoryIntentStore {
    records: Mutex<HashMap<String, FeatureIntentRecord>>,
}

#[cfg(test)]
impl MemoryIntentStore {
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl IntentStore for MemoryIntentStore {
    async fn upsert(&self, mut record: FeatureIntentRecord) -> anyhow::Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow!("memory intent store lock poisoned"))?;
        if let Some(existing) = records.get(&record.feature_id) {
            record.created_at = existing.created_at;
        }
        records.insert(record.feature_id.clone(), record);
        Ok(())
    }

    async fn get(&self, feature_id: &str) -> anyhow::Result<Option<FeatureIntentRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| anyhow!("memory intent store lock poisoned"))?;
        Ok(records.get(feature_id).cloned())
    }

    async fn remove(&self, feature_id: &str) -> anyhow::Result<bool> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow!("memory intent store lock poisoned"))?;
        Ok(records.remove(feature_id).is_some())
    }

    async fn find_enriched(
        &self,
        fingerprint: &str,
    ) -> anyhow::Result<Option<FeatureIntentRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|_| anyhow!("memory intent store lock poisoned"))?;
        let mut matches: Vec<_> = records
            .values()
            .filter(|r| r.fingerprint == fingerprint && r.is_enriched())
            .collect();
        matches.sort_by(|a, b| a.feature_id.cmp(&b.feature_id));
        Ok(matches.first().map(|r| (*r).clone()))
    }
}

/// One pretty-printed JSON document per feature under `root`.
pub struct JsonDirIntentStore {
    root: PathBuf,
}

impl JsonDirIntentStore {
    pub async fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("creating intent store at {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Sanitized id plus a short blake3 of the raw id, so `a/b` and `a_b`
    /// land in different files.
    fn record_path(&self, feature_id: &str) -> PathBuf {
        let digest = blake3::hash(feature_id.as_bytes()).to_hex();
        let file_name: String = feature_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root
            .join(format!("{file_name}-{}.json", &digest.as_str()[..12]))
    }

    async fn read_record(path: &Path) -> anyhow::Result<FeatureIntentRecord> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("decoding {}", path.display()))
    }
}

#[async_trait]
impl IntentStore for JsonDirIntentStore {
    async fn upsert(&self, mut record: FeatureIntentRecord) -> anyhow::Result<()> {
        let path = self.record_path(&record.feature_id);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            if let Ok(existing) = Self::read_record(&path).await {
                record.created_at = existing.created_at;
            }
        }
        let body = serde_json::to_vec_pretty(&record).context("encoding intent record")?;
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, body)
            .await
            .with_context(|| format!("writing {}", staging.display()))?;
        tokio::fs::rename(&staging, &path)
            .await
            .with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }

    async fn get(&self, feature_id: &str) -> anyhow::Result<Option<FeatureIntentRecord>> {
        let path = self.record_path(feature_id);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }
        Self::read_record(&path).await.map(Some)
    }

    async fn remove(&self, feature_id: &str) -> anyhow::Result<bool> {
        let path = self.record_path(feature_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err).with_context(|| format!("removing {}", path.display())),
        }
    }

    async fn find_enriched(
        &self,
        fingerprint: &str,
    ) -> anyhow::Result<Option<FeatureIntentRecord>> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .with_context(|| format!("listing {}", self.root.display()))?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            match Self::read_record(&path).await {
                Ok(record) if record.fingerprint == fingerprint && record.is_enriched() => {
                    return Ok(Some(record));
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(?err, "skipping unreadable intent record"),
            }
        }
        Ok(None)
    }
}
