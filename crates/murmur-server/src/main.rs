use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::http::Method;
use clap::Parser;
use murmur_federation::{FederationClient, FetchRemotePollService, RemotePollFetcher};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = cli::Args::parse();
    let mut config = config::Config::load(&args.config)?;
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }

    ensure_database_dir(&config.database.url);

    let db = murmur_db::create_pool(&config.database.url, config.database.max_connections).await?;
    murmur_db::run_migrations(&db).await?;

    let poll_fetcher = if config.federation.enabled {
        let client = build_federation_client(&config)?;
        let fetcher: Arc<dyn RemotePollFetcher> =
            Arc::new(FetchRemotePollService::new(db.clone(), client));
        Some(fetcher)
    } else {
        tracing::info!("Federation disabled, remote polls are served from storage");
        None
    };

    let state = murmur_core::AppState {
        db,
        config: murmur_core::AppConfig {
            poll_stale_after: config.polls.stale_after()?,
        },
        poll_fetcher,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    let app = murmur_api::build_router()
        .layer(ConcurrencyLimitLayer::new(config.server.max_concurrent_requests))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(
        bind_address = %config.server.bind_address,
        database = %config.database.url,
        federation = config.federation.enabled,
        "murmur listening"
    );

    let shutdown_signal = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutting down...");
    };

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

/// `MURMUR_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("murmur=info,tower_http=debug"));
    let json = std::env::var("MURMUR_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_federation_client(config: &config::Config) -> Result<FederationClient> {
    let signing_key = match config.signing_key_hex()? {
        Some(hex) => murmur_federation::signing::signing_key_from_hex(&hex)?,
        None => {
            let (key, public_hex) = murmur_federation::signing::generate_keypair();
            tracing::warn!(
                public_key = %public_hex,
                "No federation signing key configured, generated an ephemeral one"
            );
            key
        }
    };

    let origin = format!("https://{}", config.federation.local_domain.trim());
    let key_id = format!("{origin}/actor#ed25519-key");
    let client = FederationClient::new_signed(
        origin,
        key_id,
        signing_key,
        Duration::from_secs(config.federation.request_timeout_secs),
    )?;
    Ok(client)
}

/// SQLite will not create missing parent directories for the database file.
fn ensure_database_dir(url: &str) {
    let Some(db_path) = url
        .strip_prefix("sqlite://")
        .and_then(|s| s.split('?').next())
    else {
        return;
    };
    if let Some(parent) = std::path::Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("Could not create directory '{}': {}", parent.display(), e);
            }
        }
    }
}
