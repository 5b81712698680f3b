//! CLI tool to add the contemporary philosophers to the stored graph
//!
//! Usage:
//!   cargo run --bin seed_graph -- --graph-file knowledge_graph.json --report

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use neurograph::{config::Settings, db, graph::analytics, logging, services::GraphService};

/// Apply the contemporary philosophers update to the stored graph
#[derive(Parser, Debug)]
#[command(name = "seed_graph")]
#[command(about = "Add contemporary philosophers and their relations to the stored graph")]
struct Args {
    /// Graph file (overrides GRAPH_FILE env var)
    #[arg(long)]
    graph_file: Option<PathBuf>,

    /// Also write the graph to the SQLite database
    #[arg(long)]
    database: bool,

    /// Print PageRank scores and communities afterwards
    #[arg(long)]
    report: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load()?;
    if let Some(graph_file) = args.graph_file {
        settings.graph_file = graph_file;
    }
    if args.database {
        settings.persist_to_database = true;
    }

    logging::init_cli(&settings.log_level);

    let persistence = db::open(&settings).await?;
    let graph = GraphService::open(persistence.graph).await?;

    let (before_nodes, before_edges) = graph.counts().await;
    let (nodes, edges) = graph.apply_seed().await?;

    println!("Contemporary philosophers and their connections have been added to the graph.");
    println!(
        "  nodes: {} -> {}\n  edges: {} -> {}",
        before_nodes, nodes, before_edges, edges
    );

    if args.report {
        println!("\nPageRank for all nodes:");
        for (node, score) in analytics::ranking(&graph.page_rank().await) {
            println!("  {}: {:.4}", node, score);
        }

        println!("\nDetected communities:");
        for (node, community) in graph.communities().await {
            println!("  {}: Community {}", node, community);
        }
    }

    Ok(())
}
