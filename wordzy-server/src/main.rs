use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wordzy_core::WordList;
use wordzy_server::{
    auth::AuthService, config::Config, create_routes, room_manager::RoomManager,
    transport::Transport, websocket::ConnectionManager,
};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Wordzy server...");

    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let words = match &config.words_file {
        Some(path) => {
            info!("Loading target words from {}", path);
            match WordList::from_file(path) {
                Ok(words) => words,
                Err(e) => {
                    error!("Failed to load word list: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        None => WordList::embedded(),
    };
    info!("{} target words loaded", words.len());

    let auth_service = match (&config.jwt_secret, config.auth_dev_mode) {
        (_, true) => {
            info!("Starting in development authentication mode - JWT validation disabled");
            Arc::new(AuthService::new_dev_mode())
        }
        (Some(secret), false) => Arc::new(AuthService::new(secret)),
        (None, false) => {
            error!("JWT_SECRET must be set unless AUTH_DEV_MODE=true");
            std::process::exit(1);
        }
    };

    let connection_manager = Arc::new(ConnectionManager::new());
    let transport: Arc<dyn Transport> = connection_manager.clone();
    let room_manager = Arc::new(RoomManager::new(
        transport,
        Arc::new(words),
        config.room_settings(),
        config.tick_interval(),
    ));

    let routes = create_routes(
        connection_manager.clone(),
        room_manager.clone(),
        auth_service,
        config.clone(),
    );

    // Start cleanup task
    let cleanup_connection_manager = connection_manager.clone();
    let cleanup_room_manager = room_manager.clone();
    let cleanup_config = config.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;

            let dropped = cleanup_connection_manager
                .cleanup_inactive_connections(cleanup_config.connection_timeout())
                .await;
            for player_id in dropped {
                cleanup_room_manager.disconnect(&player_id).await;
            }

            let removed = cleanup_room_manager
                .cleanup_idle_rooms(cleanup_config.room_idle_timeout())
                .await;
            if removed > 0 {
                info!("Disbanded {} idle rooms", removed);
            }
        }
    });

    let host = match config.host.parse::<std::net::IpAddr>() {
        Ok(host) => host,
        Err(e) => {
            error!("Invalid HOST {:?}: {}", config.host, e);
            std::process::exit(1);
        }
    };

    info!("Server starting on {}:{}", host, config.port);

    let (addr, server) =
        warp::serve(routes).bind_with_graceful_shutdown((host, config.port), shutdown_signal());

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}

async fn shutdown_signal() {
    // Wait for SIGINT (Ctrl+C) or SIGTERM
    #[cfg(unix)]
    {
        let (mut sigint, mut sigterm) = match (
            signal::unix::signal(signal::unix::SignalKind::interrupt()),
            signal::unix::signal(signal::unix::SignalKind::terminate()),
        ) {
            (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
            _ => {
                error!("Failed to install signal handlers");
                return std::future::pending().await;
            }
        };

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
            return;
        }
        info!("Received Ctrl+C, shutting down gracefully...");
    }
}
