//! Neurograph server
//!
//! Serves the knowledge graph API and the enrichment endpoints.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use neurograph::{
    config::{Environment, Settings},
    logging,
    server::App,
};

#[derive(Parser, Debug)]
#[command(name = "neurograph")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (overrides PORT env var)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides HOST env var)
    #[arg(long)]
    host: Option<String>,

    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL env var)
    #[arg(long)]
    log_level: Option<String>,

    /// Environment: dev, staging, prod (overrides ENVIRONMENT env var)
    #[arg(short, long)]
    env: Option<Environment>,

    /// Graph file (overrides GRAPH_FILE env var)
    #[arg(long)]
    graph_file: Option<PathBuf>,

    /// Also persist the graph to the SQLite database
    #[arg(long)]
    database: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Settings first, so the log level is known before logging starts
    let mut settings = Settings::load()?;

    if let Some(port) = args.port {
        settings.port = port;
    }
    if let Some(host) = args.host {
        settings.host = host;
    }
    if let Some(log_level) = args.log_level {
        settings.log_level = log_level;
    }
    if let Some(env) = args.env {
        settings.environment = env;
    }
    if let Some(graph_file) = args.graph_file {
        settings.graph_file = graph_file;
    }
    if args.database {
        settings.persist_to_database = true;
    }
    settings.validate()?;

    logging::init_json(&settings.log_level);

    tracing::info!(
        app_name = %settings.app_name,
        version = %settings.app_version,
        environment = %settings.environment,
        host = %settings.host,
        port = %settings.port,
        graph_file = %settings.graph_file.display(),
        database = settings.persist_to_database,
        "Starting application"
    );

    let app = App::new(settings).await?;
    app.run_with_graceful_shutdown().await?;

    tracing::info!("Application shutdown complete");

    Ok(())
}
