use lendscope::cache::SnapshotCache;
use lendscope::gateway::RpcGateway;
use lendscope::orchestration::PortfolioService;
use lendscope::{api, config::Config, Address, ReadGateway, TokenRegistry};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

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

    let registry = match TokenRegistry::from_entries(&config.token_entries) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            eprintln!("Token registry error: {}", e);
            std::process::exit(1);
        }
    };

    let gateway: Arc<dyn ReadGateway> = Arc::new(RpcGateway::new(
        config.rpc_url.clone(),
        Duration::from_millis(config.rpc_retry_delay_ms),
        Duration::from_millis(config.rpc_retry_max_elapsed_ms),
    ));
    let cache = Arc::new(SnapshotCache::new(config.staleness_ms));
    let service = Arc::new(PortfolioService::new(
        gateway,
        registry.clone(),
        cache,
        Address::new(config.ledger_contract.clone()),
        config.payment_cadence_secs,
    ));

    // Create router
    let app = api::create_router(api::AppState::new(service, registry));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
