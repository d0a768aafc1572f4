use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use visitor_signin::{build_app, config::Config, store, AppState};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("visitor_signin=info,tower_http=info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if config.admin_password.is_none() {
        tracing::warn!("ADMIN_PASSWORD is not set, admin login is disabled");
    }

    let store = match store::connect(&config).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("failed to open backing store: {e}");
            return ExitCode::FAILURE;
        }
    };

    let app = build_app(AppState::new(&config, store));

    let listener = match TcpListener::bind(config.addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("failed to bind {}: {e}", config.addr);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("listening on {}", config.addr);
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
