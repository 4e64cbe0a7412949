use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stylematch::api::{AppState, create_router};
use stylematch::config::Config;
use stylematch::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "stylematch", version, about = "Find shoppable clothes that look like a photo")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve {
        /// Listen address, overrides BIND_ADDR
        #[arg(long)]
        bind: Option<String>,
    },
    /// Analyze a local image and print the result as JSON
    Analyze {
        image: PathBuf,
        #[arg(long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The fmt subscriber also captures `log` records.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => serve(config, bind).await,
        Command::Analyze { image, pretty } => analyze(config, image, pretty).await,
    }
}

async fn serve(config: Config, bind: Option<String>) -> anyhow::Result<()> {
    let addr = bind.unwrap_or_else(|| config.bind_addr.clone());
    let state = AppState::from_config(&config)?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}

async fn analyze(config: Config, image: PathBuf, pretty: bool) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(&image)
        .await
        .with_context(|| format!("Failed to read {}", image.display()))?;
    anyhow::ensure!(!bytes.is_empty(), "{} is empty", image.display());

    let pipeline = Pipeline::from_config(&config)?;
    let analysis = pipeline.analyze(&bytes).await;
    if let Some(query) = &analysis.query {
        tracing::info!("search query: {query}");
    }
    tracing::info!("result source: {}", analysis.origin.as_str());

    let json = if pretty {
        serde_json::to_string_pretty(&analysis.result)?
    } else {
        serde_json::to_string(&analysis.result)?
    };
    println!("{json}");
    Ok(())
}
