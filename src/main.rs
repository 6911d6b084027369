use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tinylink::analytics::build_geo_lookup;
use tinylink::app::build_router;
use tinylink::config::Config;
use tinylink::service::LinkService;
use tinylink::session::SessionKeys;
use tinylink::state::AppState;
use tinylink::storage;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    let storage = storage::connect(&config.database).await?;
    info!("Database initialized successfully");

    let geo = build_geo_lookup(&config.analytics)?;
    if config.analytics.enabled {
        info!("📊 Visit analytics enabled (geo provider: {:?})", config.analytics.geo_provider);
    } else {
        info!("📊 Visit analytics disabled");
    }

    let service = LinkService::new(storage)
        .with_geo_lookup(geo)
        .with_analytics(config.analytics.enabled);

    let state = Arc::new(AppState {
        service: Arc::new(service),
        analytics: config.analytics.clone(),
    });
    let session_keys = Arc::new(SessionKeys::from_config(&config.session));

    let app = build_router(state, session_keys);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Server listening on http://{}", addr);
    info!("   - API endpoints available at http://{}/api/urls", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
