use anyhow::Result;
use clap::Parser;
use std::io::{self, BufRead, Write};

use docqa_cli::{init_tracing, ExtractiveAnswerer, Startup};

/// Ask questions about a single document.
///
/// Each question prints the lines that best answer it, followed by the context
/// they were drawn from: the best matching passages, or the whole document
/// when retrieval finds too little.
#[derive(Parser)]
#[command(name = "docqa", version, about)]
struct Cli {
    /// Document to load (default: `document.path` from config)
    #[arg(long)]
    doc: Option<String>,

    /// Keyword search only; skip loading the embedding model
    #[arg(long)]
    no_embeddings: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let startup = Startup::load(cli.no_embeddings)?;
    let agent = startup.agent(cli.doc.as_deref(), false)?;
    let answerer = ExtractiveAnswerer::default();
    println!("Ready. Type a question, or 'quit' to exit.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();
    loop {
        print!("\n> ");
        stdout.flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("quit") || query.eq_ignore_ascii_case("exit") {
            break;
        }
        match agent.ask(query, &answerer) {
            Ok(a) => {
                println!("{}", a.answer);
                println!("--- context, {} chars ---\n{}", a.context.chars().count(), a.context);
            }
            Err(e) => eprintln!("Error: {e}"),
        }
    }
    println!("Goodbye.");
    Ok(())
}
