//! Feature processing: extract, normalize, fingerprint, enrich, persist.

pub mod discover;
pub mod store;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::config::IntentConfig;
use crate::enrich::{Enrichment, EnrichmentGuardrail, EnrichmentStatus, SkipReason};
use crate::extract::{extract, ExtractOptions, WorkspaceIndex};
use crate::intent::{fingerprint, normalize_as, CanonicalIntentModel};

pub use discover::{discover_features, discover_workspace_files, feature_id_for};
pub use store::{
    FeatureIntentRecord, IntentStore, JsonDirIntentStore, MemoryIntentStore, SharedIntentStore,
    SourceDigest,
};

#[derive(Debug, Clone)]
pub struct FeatureRequest {
    pub feature_id: String,
    pub files: Vec<PathBuf>,
}

impl FeatureRequest {
    pub fn new(feature_id: impl Into<String>, files: Vec<PathBuf>) -> Self {
        Self {
            feature_id: feature_id.into(),
            files,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureStatus {
    Skipped,
    Processed,
}

/// What callers get back from `process_feature`.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureResult {
    pub feature_id: String,
    pub status: FeatureStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized_model: Option<CanonicalIntentModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enriched_model: Option<Enrichment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment_status: Option<EnrichmentStatus>,
}

impl FeatureResult {
    fn empty_feature(feature_id: &str) -> Self {
        Self {
            feature_id: feature_id.to_string(),
            status: FeatureStatus::Skipped,
            reason: Some(SkipReason::EmptyFeature),
            intent_hash: None,
            normalized_model: None,
            enriched_model: None,
            enrichment_status: None,
        }
    }
}

#[derive(Clone)]
pub struct IntentPipeline {
    store: SharedIntentStore,
    guardrail: Arc<EnrichmentGuardrail>,
    options: ExtractOptions,
    extraction_version: String,
    max_parallel: usize,
}

impl IntentPipeline {
    pub fn new(
        config: &IntentConfig,
        store: SharedIntentStore,
        guardrail: EnrichmentGuardrail,
    ) -> Self {
        Self {
            store,
            guardrail: Arc::new(guardrail),
            options: ExtractOptions {
                max_depth: config.max_expansion_depth,
            },
            extraction_version: config.extraction_version.clone(),
            max_parallel: config.max_parallel_features.max(1),
        }
    }

    #[cfg(test)]
    pub fn without_enrichment(store: SharedIntentStore) -> Self {
        Self::new(&IntentConfig::default(), store, EnrichmentGuardrail::disabled())
    }

    #[instrument(skip_all, fields(session_id = %session_id, feature_id = %feature_id))]
    pub async fn process_feature(
        &self,
        session_id: &str,
        feature_id: &str,
        file_paths: &[PathBuf],
        workspace_files: Option<&[PathBuf]>,
    ) -> anyhow::Result<FeatureResult> {
        let index = match workspace_files {
            Some(files) => Some(build_index(files.to_vec()).await?),
            None => None,
        };
        self.run_feature(session_id, feature_id, file_paths.to_vec(), index)
            .await
    }

    /// Process many features against one shared index. Results come back in
    /// request order; a persistence failure aborts the whole batch.
    #[instrument(skip_all, fields(session_id = %session_id, features = requests.len()))]
    pub async fn process_features(
        &self,
        session_id: &str,
        requests: Vec<FeatureRequest>,
        workspace_files: Option<&[PathBuf]>,
    ) -> anyhow::Result<Vec<FeatureResult>> {
        let index = match workspace_files {
            Some(files) => Some(build_index(files.to_vec()).await?),
            None => None,
        };

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut tasks = JoinSet::new();
        let total = requests.len();

        for (position, request) in requests.into_iter().enumerate() {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .context("feature semaphore closed")?;
            let pipeline = self.clone();
            let index = index.clone();
            let session_id = session_id.to_string();
            tasks.spawn(async move {
                let _permit = permit;
                let result = pipeline
                    .run_feature(&session_id, &request.feature_id, request.files, index)
                    .await;
                (position, result)
            });
        }

        let mut results: Vec<Option<FeatureResult>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            let (position, result) = joined.context("feature task panicked")?;
            results[position] = Some(result?);
        }

        info!(features = total, "batch finished");
        Ok(results.into_iter().flatten().collect())
    }

    async fn run_feature(
        &self,
        session_id: &str,
        feature_id: &str,
        files: Vec<PathBuf>,
        index: Option<Arc<WorkspaceIndex>>,
    ) -> anyhow::Result<FeatureResult> {
        let options = self.options;
        let paths = files.clone();
        let raw = tokio::task::spawn_blocking(move || extract(&paths, index.as_deref(), &options))
            .await
            .context("extraction task panicked")?;

        let canonical = normalize_as(&raw, &self.extraction_version);
        if canonical.is_empty() {
            info!(feature_id, "no steps or assertions, skipping");
            // An emptied feature leaves no record from earlier runs behind.
            if self
                .store
                .remove(feature_id)
                .await
                .with_context(|| format!("dropping stale intent record for {feature_id}"))?
            {
                info!(feature_id, "removed stale intent record");
            }
            return Ok(FeatureResult::empty_feature(feature_id));
        }

        let hash = fingerprint(&canonical).context("fingerprinting canonical model")?;
        debug!(feature_id, fingerprint = %hash, steps = canonical.steps.len(), "feature normalized");

        let outcome = self
            .guardrail
            .enrich(&canonical, &hash, self.store.as_ref())
            .await?;
        let enrichment_status = outcome.status;
        let enriched_model = outcome.enrichment.clone();

        let mut record =
            FeatureIntentRecord::new(session_id, feature_id, raw, canonical.clone(), hash.clone());
        record.source_digests = digest_sources(&files).await;
        record.apply_enrichment(outcome);
        self.store
            .upsert(record)
            .await
            .with_context(|| format!("persisting intent record for {feature_id}"))?;

        info!(feature_id, status = ?enrichment_status, "feature processed");
        Ok(FeatureResult {
            feature_id: feature_id.to_string(),
            status: FeatureStatus::Processed,
            reason: None,
            intent_hash: Some(hash),
            normalized_model: Some(canonical),
            enriched_model,
            enrichment_status: Some(enrichment_status),
        })
    }
}

async fn build_index(files: Vec<PathBuf>) -> anyhow::Result<Arc<WorkspaceIndex>> {
    let index = tokio::task::spawn_blocking(move || WorkspaceIndex::build(&files))
        .await
        .context("index build task panicked")?;
    debug!(
        classes = index.class_count(),
        skipped = index.diagnostics().len(),
        "workspace index built"
    );
    Ok(Arc::new(index))
}

async fn digest_sources(files: &[PathBuf]) -> Vec<SourceDigest> {
    let mut digests = Vec::with_capacity(files.len());
    for path in files {
        match tokio::fs::read(path).await {
            Ok(bytes) => digests.push(SourceDigest::of(path, &bytes)),
            Err(err) => warn!(path = %path.display(), %err, "cannot digest feature file"),
        }
    }
    digests
}

/// Feature requests for every test file in a workspace.
pub fn feature_requests(root: &Path, workspace_files: &[PathBuf]) -> Vec<FeatureRequest> {
    discover_features(workspace_files)
        .into_iter()
        .map(|path| FeatureRequest::new(feature_id_for(root, &path), vec![path]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::ActionKind;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_dir(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("intent-lens-{label}-{nanos}"));
        fs::create_dir_all(&dir).expect("scratch dir");
        dir
    }

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).expect("write source");
        path
    }

    const LOGIN_PAGE: &str = r#"
public class LoginPage {
    private By user = By.id("user");
    private By go = By.id("go");
    public void login(String name) {
        type(user, name);
        click(go);
    }
}
"#;

    const LOGIN_TEST: &str = r#"
class LoginTest {
    @Test
    public void logsIn() {
        LoginPage page = new LoginPage(driver);
        page.login("admin");
        Assert.assertTrue(page.isLoggedIn());
    }
}
"#;

    #[tokio::test]
    async fn empty_features_are_skipped_and_not_persisted() {
        let dir = scratch_dir("empty");
        let file = write(
            &dir,
            "EmptyTest.java",
            "class EmptyTest { @Test public void nothing() { int x = 1; } }",
        );
        let store = Arc::new(MemoryIntentStore::default());
        let pipeline = IntentPipeline::without_enrichment(store.clone());

        let result = pipeline
            .process_feature("s1", "empty", &[file], None)
            .await
            .expect("process");
        assert_eq!(result.status, FeatureStatus::Skipped);
        assert_eq!(result.reason, Some(SkipReason::EmptyFeature));
        assert!(store.is_empty());

        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn emptied_features_drop_their_earlier_record() {
        let dir = scratch_dir("emptied");
        let page = write(&dir, "LoginPage.java", LOGIN_PAGE);
        let test = write(&dir, "LoginTest.java", LOGIN_TEST);
        let workspace = vec![page, test.clone()];
        let store = Arc::new(MemoryIntentStore::default());
        let pipeline = IntentPipeline::without_enrichment(store.clone());

        let first = pipeline
            .process_feature("s1", "login", &[test.clone()], Some(&workspace))
            .await
            .expect("first run");
        assert_eq!(first.status, FeatureStatus::Processed);
        assert!(store.get("login").await.expect("get").is_some());

        fs::write(
            &test,
            "class LoginTest { @Test public void logsIn() { int x = 1; } }",
        )
        .expect("rewrite test");
        let second = pipeline
            .process_feature("s1", "login", &[test], Some(&workspace))
            .await
            .expect("second run");
        assert_eq!(second.status, FeatureStatus::Skipped);
        assert_eq!(second.reason, Some(SkipReason::EmptyFeature));
        assert!(store.get("login").await.expect("get").is_none());

        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn processing_is_deterministic_and_persisted() {
        let dir = scratch_dir("login");
        let page = write(&dir, "LoginPage.java", LOGIN_PAGE);
        let test = write(&dir, "LoginTest.java", LOGIN_TEST);
        let workspace = vec![page, test.clone()];
        let store = Arc::new(MemoryIntentStore::default());
        let pipeline = IntentPipeline::without_enrichment(store.clone());

        let first = pipeline
            .process_feature("s1", "login", &[test.clone()], Some(&workspace))
            .await
            .expect("first run");
        let second = pipeline
            .process_feature("s1", "login", &[test], Some(&workspace))
            .await
            .expect("second run");

        assert_eq!(first.status, FeatureStatus::Processed);
        assert_eq!(first.intent_hash, second.intent_hash);
        assert_eq!(first.enrichment_status, Some(EnrichmentStatus::Skipped));
        let model = first.normalized_model.expect("model");
        let actions: Vec<_> = model.steps.iter().map(|s| s.action).collect();
        assert_eq!(actions, vec![ActionKind::Type, ActionKind::Click]);

        let record = store.get("login").await.expect("get").expect("record");
        assert_eq!(Some(record.fingerprint), first.intent_hash);
        assert_eq!(record.source_digests.len(), 1);
        assert!(!record.llm_used);

        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn batches_keep_request_order() {
        let dir = scratch_dir("batch");
        let page = write(&dir, "LoginPage.java", LOGIN_PAGE);
        let login = write(&dir, "LoginTest.java", LOGIN_TEST);
        let empty = write(
            &dir,
            "EmptyTest.java",
            "class EmptyTest { @Test public void nothing() {} }",
        );
        let workspace = vec![page, login.clone(), empty.clone()];

        let config = IntentConfig {
            enrichment_enabled: false,
            max_parallel_features: 2,
            ..IntentConfig::default()
        };
        let store = Arc::new(MemoryIntentStore::default());
        let pipeline =
            IntentPipeline::new(&config, store.clone(), EnrichmentGuardrail::from_config(&config));

        let requests = feature_requests(&dir, &workspace);
        let ids: Vec<_> = requests.iter().map(|r| r.feature_id.clone()).collect();
        assert_eq!(ids, vec!["LoginTest.java", "EmptyTest.java"]);

        let results = pipeline
            .process_features("s1", requests, Some(&workspace))
            .await
            .expect("batch");
        let statuses: Vec<_> = results.iter().map(|r| (r.feature_id.as_str(), r.status)).collect();
        assert_eq!(
            statuses,
            vec![
                ("LoginTest.java", FeatureStatus::Processed),
                ("EmptyTest.java", FeatureStatus::Skipped),
            ]
        );
        assert_eq!(store.len(), 1);

        let _ = fs::remove_dir_all(&dir);
    }
}
