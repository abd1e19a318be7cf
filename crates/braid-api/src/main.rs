use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use braid_api::{
    clients::ProviderClientFactory,
    config::Config,
    handlers::{health, stream, threads},
    middleware::logging,
    state::AppState,
};
use braid_flow::standard_flow;
use braid_gen::{DisabledSearch, EnvCredentialStore};
use braid_store::{LocalStore, MemoryStore};
use braid_sync::{select_channel, HttpRemoteStore, RemoteSync};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config);

    tracing::info!("Starting Braid API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    let store = build_store(&config).await?;

    let credentials: Arc<dyn braid_gen::CredentialStore> = Arc::new(EnvCredentialStore);
    let flow = standard_flow(
        Arc::clone(&credentials),
        Arc::new(ProviderClientFactory::new(Arc::clone(&credentials))),
        Arc::new(DisabledSearch),
    )?;

    let channel = select_channel(
        config.sync.broadcast,
        Duration::from_millis(config.sync.poll_interval_ms),
    );

    let sync = if config.sync.enabled && !config.sync.remote_url.is_empty() {
        tracing::info!("remote sync enabled: {}", config.sync.remote_url);
        Some(RemoteSync::new(
            Arc::clone(&store),
            Arc::new(HttpRemoteStore::new(config.sync.remote_url.clone())),
            Duration::from_millis(config.sync.debounce_ms),
        ))
    } else {
        tracing::info!("remote sync disabled, local store only");
        None
    };

    let state = Arc::new(AppState::new(
        config.clone(),
        store,
        flow,
        credentials,
        channel,
        sync,
    ));
    state.hydrate().await?;

    let app = build_router(state.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn LocalStore>> {
    match config.storage.backend.as_str() {
        #[cfg(feature = "mongodb")]
        "mongodb" => {
            tracing::info!("Connecting to MongoDB");
            let store =
                braid_store::MongoStore::connect(&config.mongodb_uri, &config.storage.database)
                    .await?;
            tracing::info!("MongoDB connected");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "mongodb"))]
        "mongodb" => Err(anyhow::anyhow!(
            "storage backend 'mongodb' requires building with the mongodb feature"
        )),
        _ => Ok(Arc::new(MemoryStore::new())),
    }
}

fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health
        .route("/health", get(health::health_check))
        // Completion stream
        .route("/completion", post(stream::completion))
        // Threads
        .route("/threads", post(threads::create_thread))
        .route("/threads", get(threads::list_threads))
        .route("/threads/:thread_id", get(threads::get_thread))
        .route("/threads/:thread_id", delete(threads::delete_thread))
        // Thread items
        .route("/threads/:thread_id/items", get(threads::list_items))
        .route(
            "/threads/:thread_id/items/:item_id",
            delete(threads::delete_item),
        )
        .route(
            "/threads/:thread_id/items/:item_id/select",
            post(threads::select_branch),
        );

    Router::new()
        .nest("/", api_routes)
        .layer(middleware::from_fn(logging::log_request))
        .layer(TimeoutLayer::new(Duration::from_secs(300))) // 5 min for streaming
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.cors.enabled {
        let mut cors = CorsLayer::new()
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers(Any);

        if config.cors.origins.iter().any(|o| o == "*") {
            cors = cors.allow_origin(Any);
        } else {
            for origin in &config.cors.origins {
                if let Ok(parsed_origin) = origin.parse::<axum::http::HeaderValue>() {
                    cors = cors.allow_origin(parsed_origin);
                }
            }
        }

        cors
    } else {
        CorsLayer::permissive()
    }
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
