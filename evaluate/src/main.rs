use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use codeswitchador::{Corpus, SequenceEvaluator};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(about = "A program to evaluate predicted tags against gold tags.")]
struct Args {
    /// The gold corpus
    gold: PathBuf,

    /// The predicted corpus
    pred: PathBuf,

    /// The training corpus, used to tell out-of-vocabulary tokens
    train: Option<PathBuf>,

    /// Do not score gold tokens that carry a comment
    #[arg(long)]
    ignore_comments: bool,
}

fn load_corpus(path: &Path) -> Result<Corpus, Box<dyn std::error::Error>> {
    info!(?path, "loading corpus");
    let f = File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    Ok(Corpus::read(BufReader::new(f))?)
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let gold = load_corpus(&args.gold)?;
    let pred = load_corpus(&args.pred)?;
    let train = args.train.as_deref().map(load_corpus).transpose()?;

    let evaluator = SequenceEvaluator::new(&gold, &pred, train.as_ref())?;
    let evaluation = evaluator.eval(args.ignore_comments);
    if !evaluation.skipped.is_empty() {
        info!(n_skipped = evaluation.skipped.len(), "skipped sequences");
    }
    print!("{}", evaluation.statistics);

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
