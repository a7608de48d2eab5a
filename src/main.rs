use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, SeedableRng};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use trading_journal::{api, db, seed, AppContext, Settings};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve,

    /// Apply schema migrations and exit
    Migrate,

    /// Fill the journal with sample trades
    Seed {
        /// Calendar months of history to generate
        #[arg(long, default_value_t = 6)]
        months: u32,

        /// Keep existing trades instead of clearing the journal first
        #[arg(long)]
        keep_existing: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = cli.settings.validate().context("Invalid configuration")?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "trading_journal={level},tower_http={level},sqlx=warn",
                level = settings.tracing_level()
            ))
        }))
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(settings).await,
        Command::Migrate => migrate(settings).await,
        Command::Seed { months, keep_existing } => seed_sample_data(settings, months, keep_existing).await,
    }
}

async fn serve(settings: Settings) -> Result<()> {
    info!("Starting {} v{}", settings.api_title, settings.api_version);
    info!("API prefix: {}", if settings.api_prefix.is_empty() { "/" } else { settings.api_prefix.as_str() });

    let addr = settings.bind_address();
    let ctx = Arc::new(AppContext::init(settings).await?);
    let app = api::router(ctx.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shutting down");
    ctx.shutdown().await;
    Ok(())
}

async fn migrate(settings: Settings) -> Result<()> {
    let pool = db::connect_with_retry(&settings.pool_config())
        .await
        .context("Failed to connect to the database")?;
    db::run_migrations(&pool).await?;
    pool.close().await;

    info!("Applied {} migrations", db::MIGRATIONS.len());
    Ok(())
}

async fn seed_sample_data(settings: Settings, months: u32, keep_existing: bool) -> Result<()> {
    if settings.in_memory {
        warn!("Seeding in-memory storage; the data is dropped when this command exits");
    }

    let ctx = AppContext::init(settings).await?;
    let mut rng = StdRng::from_entropy();
    let stats = seed::seed_journal(ctx.trades(), &mut rng, months, keep_existing).await?;

    info!("Total trades: {}", stats.total_trades);
    info!("Winning trades: {}", stats.winning_trades);
    info!("Losing trades: {}", stats.losing_trades);
    info!("Total P&L: {:.2}", stats.total_pnl);
    if let Some(avg) = stats.avg_pnl {
        info!("Average P&L: {:.2}", avg);
    }
    for month in &stats.monthly {
        info!("{}: {} trades, P&L {:.2}", month.month, month.trades, month.pnl);
    }

    ctx.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl_c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
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
}
