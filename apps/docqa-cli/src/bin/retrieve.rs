use anyhow::Result;
use clap::Parser;
use serde::Serialize;

use docqa_cli::{init_tracing, Startup};
use docqa_hybrid::Outcome;

/// Print the context retrieved for one query.
#[derive(Parser)]
#[command(name = "docqa-retrieve", version, about)]
struct Cli {
    /// Query text
    query: String,

    /// Document to load (default: `document.path` from config)
    #[arg(long)]
    doc: Option<String>,

    /// Keyword search only; skip loading the embedding model
    #[arg(long)]
    no_embeddings: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Output<'a> {
    query: &'a str,
    outcome: Outcome,
    retrieved_chars: usize,
    context: &'a str,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let startup = Startup::load(cli.no_embeddings)?;
    let agent = startup.agent(cli.doc.as_deref(), true)?;
    let r = agent.retrieve_detailed(&cli.query)?;

    if cli.json {
        let out = Output { query: &cli.query, outcome: r.outcome, retrieved_chars: r.retrieved_chars, context: &r.context };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", r.context);
    }
    Ok(())
}
