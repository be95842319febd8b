mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{Method, header::{AUTHORIZATION, CONTENT_TYPE}};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use threadline_api::enrich::Enricher;
use threadline_api::media::{CloudinaryMedia, LocalMedia, MediaHost};
use threadline_api::{AppState, AppStateInner};
use threadline_db::Database;
use threadline_gateway::Dispatcher;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "threadline=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);

    let media = if config.media_disabled {
        info!("Image uploads disabled");
        MediaHost::Disabled
    } else if let Some(cloud) = &config.cloudinary {
        info!("Images hosted on Cloudinary cloud '{}'", cloud.cloud_name);
        MediaHost::Cloudinary(CloudinaryMedia::new(
            cloud.cloud_name.clone(),
            cloud.api_key.clone(),
            cloud.api_secret.clone(),
        ))
    } else {
        info!("Images stored under {}", config.media_dir.display());
        MediaHost::Local(LocalMedia::new(&config.media_dir, &config.public_url))
    };

    let enricher = match &config.geo {
        Some(geo) => Enricher::new(&geo.url, &geo.token)?,
        None => Enricher::disabled(),
    };

    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        dispatcher: Dispatcher::new(),
        media,
        enricher: Arc::new(enricher),
        cookie_secure: config.cookie_secure,
    });

    let mut app = threadline_api::router(state.clone());
    if matches!(state.media, MediaHost::Local(_)) {
        app = app.nest_service("/media", ServeDir::new(&config.media_dir));
    }

    // Session cookies need credentialed CORS, so origins are mirrored rather than `*`
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let app = app.layer(cors).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Threadline server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
