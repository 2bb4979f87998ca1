use serde::Serialize;
use tracing_subscriber::EnvFilter;

use ecash_history::config::Config;
use ecash_history::pipeline::{load_history, load_utxos, HistoryPipeline, HistoryReport};
use ecash_history::tokens::JsonTokenSource;
use ecash_history::wallet::{organize, OrganizedUtxos};

#[derive(Serialize)]
struct Output {
    history: HistoryReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    utxos: Option<OrganizedUtxos<serde_json::Value>>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    // Logs go to stderr so stdout stays valid JSON (set RUST_LOG to tune)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path)?;
    tracing::info!(
        history_files = config.input.history.len(),
        known_tokens = config.tokens.len(),
        "Configuration loaded from {}",
        config_path
    );

    let source = match &config.input.tokens {
        Some(path) => JsonTokenSource::load(path)?,
        None => JsonTokenSource::default(),
    };
    let pipeline = HistoryPipeline::init(&config, source)?;
    tracing::info!(wallet_hashes = pipeline.wallet.len(), "History pipeline initialized");

    let pages = load_history(&config.input.history)?;
    let history = pipeline.run(pages).await;

    let utxos = match &config.input.utxos {
        Some(path) => {
            let organized = organize(load_utxos(path)?);
            tracing::info!(
                slp = organized.slp_utxos.len(),
                non_slp = organized.non_slp_utxos.len(),
                "Organized utxos"
            );
            Some(organized)
        }
        None => None,
    };

    let rendered = serde_json::to_string_pretty(&Output { history, utxos })
        .map_err(|e| eyre::eyre!("Failed to render output: {}", e))?;
    println!("{}", rendered);
    Ok(())
}
