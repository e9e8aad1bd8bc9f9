use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use person_finder_api::aggregator::PersonSearchService;
use person_finder_api::config::Config;
use person_finder_api::discovery::DuckDuckGoDiscovery;
use person_finder_api::handlers::{self, AppState};
use person_finder_api::orchestrator::SearchUseCase;
use person_finder_api::providers::build_providers;
use person_finder_api::store::SearchCache;
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "person_finder_api=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    let discovery = Arc::new(DuckDuckGoDiscovery::default());
    let providers = build_providers(&config, discovery);
    let service = PersonSearchService::new(providers);
    let cache = SearchCache::new();
    let use_case = Arc::new(SearchUseCase::new(service, cache));

    let state = AppState {
        use_case,
        metrics_handle,
        started_at: Instant::now(),
    };

    let app = Router::new()
        .route("/api/search", post(handlers::search))
        .route("/api/info", get(handlers::info))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(64 * 1024))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
