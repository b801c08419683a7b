// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio::{net::TcpListener, signal};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use portfolio_server::{
    api::router,
    config::{LogFormat, ServerSettings, Settings},
    state::AppState,
    storage::{FileIdentityStore, FileStorage, IdentityStore, InMemoryIdentityStore, StoragePaths},
};

const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    init_tracing(settings.server.log_format);

    let (identities, storage): (Arc<dyn IdentityStore>, _) = match &settings.server.data_dir {
        Some(dir) => {
            let mut storage = FileStorage::new(StoragePaths::new(dir));
            storage.initialize()?;
            tracing::info!(data_dir = %dir.display(), "Using file-backed identity and content storage");
            (Arc::new(FileIdentityStore::new(storage.clone())), Some(storage))
        }
        None => {
            tracing::warn!("DATA_DIR not set, identities and content are kept in memory");
            (Arc::new(InMemoryIdentityStore::new()), None)
        }
    };

    let mut state = AppState::new(identities, &settings.auth, settings.oauth2.clone())?;
    if let Some(storage) = storage {
        state = state.with_storage(storage)?;
    }

    if let Some((email, password)) = &settings.server.admin_seed {
        let admin = state.credentials.seed_admin(email, password)?;
        tracing::info!(identity_id = %admin.id, "Admin account ready");
    }

    let providers = state.oauth2.enabled_providers();
    tracing::info!(providers = ?providers, "OAuth2 providers enabled");

    let app = router(state);
    serve(&settings.server, app).await
}

/// Initialize tracing based on configuration.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init(),
    }
}

async fn serve(server: &ServerSettings, app: axum::Router) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("{}:{}", server.host, server.port).parse()?;

    match &server.tls {
        Some((cert_path, key_path)) => {
            // Install the ring crypto provider for rustls (must be done before any TLS operations)
            let _ = rustls::crypto::ring::default_provider().install_default();
            let tls_config = RustlsConfig::from_pem_file(cert_path, key_path).await?;

            let handle = Handle::new();
            let shutdown = handle.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
            });

            tracing::info!(address = %addr, "Portfolio server listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = TcpListener::bind(addr).await?;
            tracing::info!(address = %addr, "Portfolio server listening on http (docs at /docs)");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    tracing::info!("Portfolio server stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
