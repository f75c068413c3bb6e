use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shadow_work::config::{Backend, Config};
use shadow_work::models::RawMessage;
use shadow_work::{ingest, report, server};

#[derive(Parser)]
#[command(name = "shadow-work")]
#[command(about = "Surface uncredited team effort from chat messages", long_about = None)]
struct Cli {
    /// Sentiment backend (overrides SENTIMENT_BACKEND)
    #[arg(long, global = true, value_enum)]
    backend: Option<Backend>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a batch and print the JSON result
    Analyze {
        /// CSV or JSON message file; the sample dataset when omitted
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long)]
        pretty: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1:5000")]
        addr: SocketAddr,
    },
}

fn load_batch(input: Option<&PathBuf>, config: &Config) -> anyhow::Result<(String, Vec<RawMessage>)> {
    let path = input.unwrap_or(&config.sample_data);
    let messages = ingest::load_messages(path)
        .with_context(|| format!("failed to load messages from {}", path.display()))?;
    Ok((path.display().to_string(), messages))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    let enricher = config.build_enricher()?;
    info!(
        backend = ?config.backend,
        concurrency = config.concurrency,
        "sentiment pipeline ready"
    );

    match cli.command {
        Commands::Analyze { input, out, pretty } => {
            let (_, messages) = load_batch(input.as_ref(), &config)?;
            let analysis = enricher.analyze(&messages).await;
            let json = if pretty {
                serde_json::to_string_pretty(&analysis)?
            } else {
                serde_json::to_string(&analysis)?
            };

            match out {
                Some(out) => {
                    std::fs::write(&out, json)
                        .with_context(|| format!("failed to write {}", out.display()))?;
                    println!("Analysis written to {}.", out.display());
                }
                None => println!("{json}"),
            }
        }
        Commands::Report { input, out } => {
            let (source, messages) = load_batch(input.as_ref(), &config)?;
            let analysis = enricher.analyze(&messages).await;
            let report = report::build_report(&source, &analysis);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Serve { addr } => {
            let state = server::AppState {
                enricher: Arc::new(enricher),
                sample_data: config.sample_data.clone(),
            };
            server::serve(addr, state).await?;
        }
    }

    Ok(())
}
