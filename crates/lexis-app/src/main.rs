//! Lexis application binary - composition root.
//!
//! 1. Parse the CLI and load configuration from TOML
//! 2. Install the tracing subscriber
//! 3. Build the configured embedding provider
//! 4. Run either the ingestion pass or the HTTP query server

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use lexis_core::config::{LexisConfig, ProviderKind};
use lexis_core::error::Result;
use lexis_vector::embedding::{
    DynEmbeddingProvider, EmbeddingProvider, MockEmbedding, OpenAiEmbedding,
};
use lexis_vector::{load_word_list, IngestSettings, IngestionPipeline, NeighborIndex};

use lexis_api::routes;
use lexis_api::state::AppState;

use cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config. A missing file means defaults; a broken one is fatal.
    let config_file = args.resolve_config_path();
    let mut config = if config_file.exists() {
        LexisConfig::load(&config_file)?
    } else {
        LexisConfig::default()
    };
    apply_overrides(&mut config, &args);
    config.validate()?;

    // Tracing. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Lexis v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        path = %config_file.display(),
        exists = config_file.exists(),
        "Configuration resolved"
    );

    match args.command {
        Command::Ingest { words, store } => {
            let words_path = words.unwrap_or_else(|| config.words_path());
            let store_path = store.unwrap_or_else(|| config.store_path());
            match config.provider.kind {
                ProviderKind::OpenAi => {
                    let provider = OpenAiEmbedding::from_config(&config.provider)?;
                    ingest(provider, &config, words_path, store_path).await?;
                }
                ProviderKind::Mock => {
                    let provider = MockEmbedding::with_dimensions(config.provider.mock_dimensions);
                    ingest(provider, &config, words_path, store_path).await?;
                }
            }
        }
        Command::Serve { reload_policy } => {
            if let Some(policy) = reload_policy {
                config.index.reload_policy = policy;
            }
            serve(config).await?;
        }
    }

    Ok(())
}

/// Fold CLI and environment overrides into the loaded configuration.
fn apply_overrides(config: &mut LexisConfig, args: &CliArgs) {
    config.general.port = args.resolve_port(config.general.port);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }
}

fn build_provider(config: &LexisConfig) -> Result<Arc<dyn DynEmbeddingProvider>> {
    Ok(match config.provider.kind {
        ProviderKind::OpenAi => Arc::new(OpenAiEmbedding::from_config(&config.provider)?),
        ProviderKind::Mock => Arc::new(MockEmbedding::with_dimensions(
            config.provider.mock_dimensions,
        )),
    })
}

async fn ingest<P: EmbeddingProvider>(
    provider: P,
    config: &LexisConfig,
    words_path: PathBuf,
    store_path: PathBuf,
) -> Result<()> {
    let words = load_word_list(&words_path)?;
    tracing::info!(
        path = %words_path.display(),
        words = words.len(),
        "Word list loaded"
    );

    let pipeline = IngestionPipeline::new(provider, IngestSettings::from(&config.ingest));
    let report = pipeline.run(&words, &store_path).await?;

    let elapsed = report.finished_at - report.started_at;
    tracing::info!(
        store = %store_path.display(),
        total = report.total_words,
        already_present = report.already_present,
        embedded = report.embedded,
        rate_limited = report.rate_limited,
        failed = report.failed,
        store_size = report.store_size,
        elapsed_secs = elapsed.num_seconds(),
        "Ingest summary"
    );
    if !report.is_complete() {
        tracing::warn!(
            remaining = report.remaining(),
            "Some words were skipped; run ingest again to retry them"
        );
    }
    Ok(())
}

async fn serve(config: LexisConfig) -> Result<()> {
    let provider = build_provider(&config)?;
    let store_path = config.store_path();
    let index = NeighborIndex::open(&store_path, config.index.reload_policy);
    tracing::info!(
        store = %store_path.display(),
        reload_policy = %config.index.reload_policy,
        "Neighbor index ready"
    );

    let state = AppState::new(config.clone(), index, provider);
    routes::start_server(&config, state).await
}
