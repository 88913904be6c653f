// ============================
// crates/backend-bin/src/main.rs
// ============================
//! Entry point for the Atithi Guardian registration API.
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use atithi_backend::{
    auth::DefaultAuth,
    config::{LoggingSettings, Settings},
    create_router,
    storage::open_store,
    AppState,
};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use zeroize::Zeroizing;

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(name = "atithi-server", version, about = "Tourist registration API server")]
struct Cli {
    /// TOML configuration file; missing files fall back to defaults
    #[arg(long, env = "ATITHI_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create an admin account directly in the configured store
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long, env = "ATITHI_ADMIN_PASSWORD")]
        password: String,
    },
    /// Print a hash of a password in the configured scheme
    HashPassword {
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load_from(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    init_tracing(&settings.logging);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings).await,
        Command::CreateAdmin { username, password } => {
            create_admin(settings, &username, Zeroizing::new(password)).await
        },
        Command::HashPassword { password } => {
            let password = Zeroizing::new(password);
            let hash = settings.auth.password_scheme.hash(&password)?;
            println!("{hash}");
            Ok(())
        },
    }
}

/// `RUST_LOG` wins over the configured level
fn init_tracing(logging: &LoggingSettings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    let addr = settings.bind_addr()?;
    let state = Arc::new(
        AppState::from_settings(settings)
            .await
            .context("initialising application state")?,
    );

    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            cleanup_state.cleanup_rate_limiters();
        }
    });

    let app = create_router(state);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn create_admin(
    settings: Settings,
    username: &str,
    password: Zeroizing<String>,
) -> anyhow::Result<()> {
    atithi_backend::validation::validate_username(username)?;

    let store = open_store(&settings.storage).await?;
    let auth = DefaultAuth::from_settings(store, &settings.auth)?;
    let admin = auth.create_admin(username, &password).await?;

    println!("Created admin {} ({})", admin.username, admin.id);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
