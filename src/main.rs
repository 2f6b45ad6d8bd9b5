use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use news_feed::aggregator::Aggregator;
use news_feed::config::Config;
use news_feed::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "news_feed=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("NEWS_CONFIG").unwrap_or_else(|_| "sources.toml".to_string());
    let config = Config::load(&config_path)?;
    info!(
        "Loaded {} feeds and {} subreddits from {}",
        config.feeds.len(),
        config.reddit.subreddits.len(),
        config_path
    );
    if config.accept_invalid_certs {
        info!("Upstream certificate validation is disabled");
    }

    let aggregator = Arc::new(Aggregator::from_config(&config)?);
    let state = Arc::new(AppState { aggregator });

    let app = routes::router(state).layer(TraceLayer::new_for_http());

    // Start server
    let bind_address = std::env::var("BIND_ADDRESS").unwrap_or(config.bind_address);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("Server starting on http://{}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
