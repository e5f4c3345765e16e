use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use trove_indexer::{
    api, config::Config, db::init_db, replay_file, ChainClient, Indexer, PointsWeights,
    Repository, StarknetRpcClient,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        eprintln!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let pool = init_db(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    let repo = Repository::new(pool, config.indexer_name.clone());

    let chain: Arc<dyn ChainClient> = Arc::new(StarknetRpcClient::new(config.starknet_rpc_url.clone()));
    let mut indexer = Indexer::new(repo.clone(), chain);
    if let Some(key) = config.flash_loan_event_key.clone() {
        indexer = indexer.with_flash_loan_key(key);
    }
    let weights = PointsWeights::load(&config.points_weights_path).with_context(|| {
        format!("Failed to load points weights from {}", config.points_weights_path)
    })?;
    tracing::info!(pools = weights.len(), "Points weights loaded");
    indexer = indexer.with_points_weights(weights);

    indexer
        .register_root_source(&config.root_source_address, config.root_source_start_block)
        .await
        .context("Failed to register root source")?;

    if let Some(path) = config.events_path.clone() {
        let indexer = indexer.clone();
        tokio::spawn(async move {
            // Failures are logged by the replay itself.
            if let Ok(applied) = replay_file(&indexer, &path).await {
                tracing::info!(applied, path = %path, "Event file fully indexed");
            }
        });
    }

    let app = api::create_router(api::AppState::new(Arc::new(repo)));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!(indexer = %config.indexer_name, "Server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
