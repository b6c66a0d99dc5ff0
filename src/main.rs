//! PlotStream service
//!
//! Snapshot ingest and Discord routing for plot scrapers.

use clap::{Parser, Subcommand};
use plotstream::{
    api::app_router,
    build_state,
    config::Config,
    money::{format_human, parse_magnitude_str},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "plotstream")]
#[command(about = "Plot snapshot ingest and Discord threshold routing")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (defaults to plotstream.toml / config.toml)
    #[arg(short, long)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve,
    /// Show configured channels and their bounds
    Channels,
    /// Parse a money value such as `1.5m` or `750k`
    Parse {
        input: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(&*shellexpand::tilde(path))?,
        None => Config::load_default()?,
    };

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Channels => {
            show_channels(&config);
            Ok(())
        }
        Commands::Parse { input } => {
            show_parse(&input);
            Ok(())
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = config.server.socket_addr()?;
    let enabled = config.enabled_channel_count();
    if enabled == 0 {
        tracing::warn!("No channel has a webhook; threshold notifications are disabled");
    }

    let state = build_state(&config)?;
    let app = app_router(state, &config);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        channels = enabled,
        mode = ?config.routing.mode,
        ttl_secs = config.buffer.ttl_secs,
        "PlotStream listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutting down");
        })
        .await?;
    Ok(())
}

fn bound(value: Option<f64>) -> String {
    value.map(format_human).unwrap_or_else(|| "-".to_string())
}

fn show_channels(config: &Config) {
    println!("\nRouting mode: {:?}\n", config.routing.mode);
    println!(
        "{:<14} {:<8} {:>10} {:>10} {:>10} {:>10}",
        "Channel", "Enabled", "MinSec", "MaxSec", "MinOther", "MaxOther"
    );
    println!("{}", "-".repeat(68));

    for channel in &config.routing.channels {
        let t = &channel.thresholds;
        println!(
            "{:<14} {:<8} {:>10} {:>10} {:>10} {:>10}",
            channel.name,
            if channel.is_enabled() { "yes" } else { "no" },
            bound(t.min_secret),
            bound(t.max_secret),
            bound(t.min_non_secret),
            bound(t.max_non_secret),
        );
    }

    let finds = if config.routing.finds_webhook.is_some() {
        "configured"
    } else {
        "not configured"
    };
    println!("\nWatchlist finds webhook: {}", finds);
}

fn show_parse(input: &str) {
    match parse_magnitude_str(input) {
        Some(value) => println!("{} -> {} ({})", input, value, format_human(value)),
        None => println!("{} -> not a number", input),
    }
}
