mod config;
mod enrich;
mod extract;
mod intent;
mod llm_client;
mod pipeline;
mod syntax;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::{info, warn};

use config::IntentConfig;
use enrich::EnrichmentGuardrail;
use extract::{extract, ExtractOptions, WorkspaceIndex};
use intent::{fingerprint, fingerprint_value, normalize_as};
use pipeline::{
    discover_workspace_files, feature_requests, IntentPipeline, IntentStore, JsonDirIntentStore,
    MemoryIntentStore, SharedIntentStore,
};

#[derive(Parser, Debug)]
#[command(
    name = "intent-lens",
    about = "Extract canonical, fingerprinted intent models from UI and API test suites"
)]
struct Cli {
    /// Directory for persisted intent records (overrides INTENT_STORE_DIR).
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Keep records in memory for this run only; nothing is written to disk.
    #[arg(long, global = true, default_value_t = false)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the canonical model and fingerprint for a feature without persisting it.
    Extract {
        /// Workspace root used to resolve page objects and parent classes.
        #[arg(long)]
        workspace: Option<PathBuf>,
        /// Source files that make up the feature.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Run the full pipeline for one feature and persist the record.
    Process {
        #[arg(long)]
        session: String,
        #[arg(long)]
        feature: String,
        #[arg(long)]
        workspace: Option<PathBuf>,
        /// Skip the enrichment call even when credentials are present.
        #[arg(long, default_value_t = false)]
        no_enrich: bool,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Discover every test file in a workspace and process them in parallel.
    Batch {
        #[arg(long)]
        session: String,
        #[arg(long)]
        workspace: PathBuf,
        #[arg(long, default_value_t = false)]
        no_enrich: bool,
    },
    /// Print the stored intent record for a feature.
    Show {
        #[arg(long)]
        feature: String,
    },
    /// Hash a canonical model JSON document the same way the pipeline does.
    Fingerprint {
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let mut config = IntentConfig::from_env().context("reading configuration")?;
    if let Some(store) = cli.store {
        config.store_dir = store;
    }

    match cli.command {
        Commands::Extract { workspace, files } => run_extract(&config, workspace, files).await,
        Commands::Process {
            session,
            feature,
            workspace,
            no_enrich,
            files,
        } => {
            let pipeline = build_pipeline(&config, cli.ephemeral, no_enrich).await?;
            let workspace_files = workspace.as_deref().map(discover_workspace_files);
            let result = pipeline
                .process_feature(&session, &feature, &files, workspace_files.as_deref())
                .await?;
            print_json(&serde_json::to_value(&result)?)
        }
        Commands::Batch {
            session,
            workspace,
            no_enrich,
        } => run_batch(&config, &session, &workspace, cli.ephemeral, no_enrich).await,
        Commands::Show { feature } => {
            let store = JsonDirIntentStore::open(&config.store_dir).await?;
            match store.get(&feature).await? {
                Some(record) => print_json(&serde_json::to_value(&record)?),
                None => bail!(
                    "no intent record for {feature} in {}",
                    store.root().display()
                ),
            }
        }
        Commands::Fingerprint { path } => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let value: Value = serde_json::from_slice(&bytes)
                .with_context(|| format!("{} is not a JSON document", path.display()))?;
            println!("{}", fingerprint_value(&value));
            Ok(())
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn build_pipeline(
    config: &IntentConfig,
    ephemeral: bool,
    no_enrich: bool,
) -> anyhow::Result<IntentPipeline> {
    let store: SharedIntentStore = if ephemeral {
        info!("intent records kept in memory only");
        Arc::new(MemoryIntentStore::default())
    } else {
        let store = JsonDirIntentStore::open(&config.store_dir).await?;
        info!(store = %store.root().display(), "intent store ready");
        Arc::new(store)
    };

    let guardrail = if no_enrich {
        EnrichmentGuardrail::disabled()
    } else {
        if config.enrichment_enabled && config.openai_api_key.is_none() {
            warn!("OPENAI_API_KEY not set; enrichment will be skipped");
        }
        EnrichmentGuardrail::from_config(config)
    };
    Ok(IntentPipeline::new(config, store, guardrail))
}

async fn run_extract(
    config: &IntentConfig,
    workspace: Option<PathBuf>,
    files: Vec<PathBuf>,
) -> anyhow::Result<()> {
    let options = ExtractOptions {
        max_depth: config.max_expansion_depth,
    };
    let version = config.extraction_version.clone();

    let (model, hash) = tokio::task::spawn_blocking(move || {
        let index = workspace
            .as_deref()
            .map(|root| WorkspaceIndex::build(&discover_workspace_files(root)));
        let raw = extract(&files, index.as_ref(), &options);
        let model = normalize_as(&raw, &version);
        let hash = fingerprint(&model);
        (model, hash)
    })
    .await
    .context("extraction task panicked")?;

    let hash = hash.context("fingerprinting canonical model")?;
    print_json(&json!({ "fingerprint": hash, "canonical_model": model }))
}

async fn run_batch(
    config: &IntentConfig,
    session: &str,
    workspace: &Path,
    ephemeral: bool,
    no_enrich: bool,
) -> anyhow::Result<()> {
    if !workspace.is_dir() {
        bail!("workspace {} is not a directory", workspace.display());
    }
    let files = discover_workspace_files(workspace);
    let requests = feature_requests(workspace, &files);
    info!(
        files = files.len(),
        features = requests.len(),
        "workspace scanned"
    );

    let pipeline = build_pipeline(config, ephemeral, no_enrich).await?;
    let results = pipeline
        .process_features(session, requests, Some(&files))
        .await?;

    let summary: Vec<Value> = results
        .iter()
        .map(|result| {
            json!({
                "feature_id": result.feature_id,
                "status": result.status,
                "reason": result.reason,
                "intent_hash": result.intent_hash,
                "enrichment_status": result.enrichment_status,
            })
        })
        .collect();
    print_json(&Value::Array(summary))
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
