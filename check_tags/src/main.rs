use std::fs::File;
use std::io::{stdin, BufReader};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use codeswitchador::Corpus;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(about = "A program to report records whose tag is not allowed.")]
struct Args {
    /// The corpus to check (stdin if omitted)
    input: Option<PathBuf>,

    /// An allowed tag
    #[arg(long = "tag", default_values_t = ["e".to_string(), "s".to_string(), "n".to_string()])]
    tags: Vec<String>,
}

/// Returns whether every tag is allowed.
fn run(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let corpus = match &args.input {
        Some(path) => {
            let f = File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
            Corpus::read(BufReader::new(f))?
        }
        None => Corpus::read(stdin().lock())?,
    };
    info!(n_sequences = corpus.len(), allowed = ?args.tags, "checking tags");

    let violations = corpus.invalid_tags(&args.tags);
    for v in &violations {
        println!("{}\t{}\t{}", v.sequence, v.position, v.tag);
    }
    if !violations.is_empty() {
        warn!(n_violations = violations.len(), "found invalid tags");
    }
    Ok(violations.is_empty())
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}
