use std::fs::File;
use std::io::{prelude::*, BufReader, BufWriter};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use codeswitchador::{compute_state_probabilities, ChainPolicy, Corpus, TokenCounts};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(about = "A program to estimate initial and transition probabilities of tag states.")]
struct Args {
    /// The training corpus
    train: PathBuf,

    /// A state; the order of the options is the order of the output
    #[arg(long = "state", required = true)]
    states: Vec<String>,

    /// A tag excluded from counting
    #[arg(long = "non-state")]
    non_states: Vec<String>,

    /// Count the transition across a skipped record
    #[arg(long)]
    carry_across: bool,

    /// The file to write the per-state token counts to
    #[arg(long)]
    emissions: Option<PathBuf>,
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    info!(path = ?args.train, "loading corpus");
    let f = File::open(&args.train).map_err(|e| format!("{}: {e}", args.train.display()))?;
    let corpus = Corpus::read(BufReader::new(f))?;

    let policy = if args.carry_across {
        ChainPolicy::CarryAcross
    } else {
        ChainPolicy::BreakAtSkip
    };
    let mut emissions = vec![TokenCounts::new(); args.states.len()];
    let probs = compute_state_probabilities(
        &corpus,
        &args.states,
        &args.non_states,
        args.emissions.as_ref().map(|_| emissions.as_mut_slice()),
        policy,
    )?;

    println!("Initial probabilities:");
    for (state, p) in args.states.iter().zip(&probs.pi) {
        println!("{}\t{}", state, p);
    }
    println!("Transition probabilities:");
    println!("\t{}", args.states.join("\t"));
    for (state, row) in args.states.iter().zip(&probs.a) {
        let row: Vec<String> = row.iter().map(|p| p.to_string()).collect();
        println!("{}\t{}", state, row.join("\t"));
    }

    if let Some(path) = args.emissions {
        info!(?path, "writing emission counts");
        let mut f = BufWriter::new(File::create(path)?);
        for (state, counts) in args.states.iter().zip(&emissions) {
            for (token, count) in counts.iter() {
                writeln!(f, "{}\t{}\t{}", state, token, count)?;
            }
        }
        f.flush()?;
    }

    Ok(())
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

    if let Err(e) = run(args) {
        eprintln!("{e}");
        process::exit(1);
    }
}
