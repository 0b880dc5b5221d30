//! Ayunetra - marketing site and authenticated Ayurveda chat

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ayunetra::{
    api::{self, AppState},
    cache::CachedPlacesLookup,
    config::{Config, StoreBackend},
    db::{
        self,
        repositories::{SqlxMessageRepository, SqlxSessionRepository, SqlxUserRepository},
    },
    hosted::{self, HostedMessageStore, HostedSessionStore, PlacesClient},
    services::{LocalSessionStore, PlaceholderResponder},
    stores::{MessageStore, PlacesLookup, SessionStore},
    templates::TemplateEngine,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ayunetra=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Ayunetra...");

    // Load configuration; missing required values stop the process here
    let config = Config::load_with_env(Path::new("config.yml"))?;
    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        return Err(e.into());
    }
    tracing::info!("Configuration loaded (store backend: {:?})", config.store.backend);

    let client = hosted::build_client(config.store.timeout_seconds)?;

    let (sessions, messages) = build_stores(&config, &client).await?;

    // Places lookup behind the in-memory cache
    let places_client: Arc<dyn PlacesLookup> = Arc::new(PlacesClient::new(
        client.clone(),
        config.maps.places_url.clone(),
        config.maps.api_key.clone().unwrap_or_default(),
    ));
    let places: Arc<dyn PlacesLookup> = Arc::new(CachedPlacesLookup::new(
        places_client,
        Duration::from_secs(config.maps.cache_ttl_seconds),
    ));
    tracing::info!("Places lookup initialized (cache ttl {}s)", config.maps.cache_ttl_seconds);

    let templates = TemplateEngine::new().context("Failed to load templates")?;
    tracing::info!("Templates loaded");

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState {
        responder: PlaceholderResponder::boxed(config.chat.placeholder_response.clone()),
        config: Arc::new(config),
        sessions,
        messages,
        places,
        templates: Arc::new(templates),
    };

    // Build router
    let app = api::build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new()),
    );

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Session and message stores for the configured backend
async fn build_stores(
    config: &Config,
    client: &reqwest::Client,
) -> Result<(Arc<dyn SessionStore>, Arc<dyn MessageStore>)> {
    match config.store.backend {
        StoreBackend::Hosted => {
            // validate() guarantees both are present
            let url = config.store.url.as_deref().unwrap_or_default();
            let anon_key = config.store.anon_key.clone().unwrap_or_default();

            let sessions = HostedSessionStore::new(client.clone(), url, anon_key.clone());
            let messages = HostedMessageStore::new(
                client.clone(),
                url,
                anon_key,
                &config.store.messages_table,
            );
            tracing::info!("Using hosted store at {}", url);

            Ok((Arc::new(sessions), Arc::new(messages)))
        }
        StoreBackend::Local => {
            let pool = db::create_pool(&config.database).await?;
            tracing::info!("Database connected: {}", config.database.url);

            let applied = db::migrations::run_migrations(&pool).await?;
            tracing::info!("Database migrations completed ({} applied)", applied);

            let sessions = LocalSessionStore::new(
                SqlxUserRepository::boxed(pool.clone()),
                SqlxSessionRepository::boxed(pool.clone()),
                config.session.lifetime_seconds,
            );

            Ok((Arc::new(sessions), SqlxMessageRepository::boxed(pool)))
        }
    }
}
