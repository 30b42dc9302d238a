use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use clap::Parser;
use codeswitchador::{Corpus, DecodeMode, FeatureSet, Perceptron};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(about = "A program to train a code-switching tagger and tag a test corpus.")]
struct Args {
    /// The training corpus
    train: PathBuf,

    /// The test corpus
    test: PathBuf,

    /// The feature configuration, one generator name per line
    features: PathBuf,

    /// The number of training iterations
    iterations: usize,

    /// The file to write the tagged test corpus to
    output: PathBuf,

    /// Decode left to right instead of finding the best label sequence
    #[arg(long)]
    greedy: bool,

    /// Test with the final weights instead of the averaged weights
    #[arg(long)]
    no_average: bool,

    /// Log the number of mistakes of every training sequence
    #[arg(long)]
    debug: bool,

    /// The file to write the trained model to
    #[arg(long)]
    model: Option<PathBuf>,

    /// The number of workers for zstd (0 means multithreaded will be disabled)
    #[arg(long, default_value = "0")]
    zstd_workers: u32,
}

fn open(path: &Path) -> Result<BufReader<File>, Box<dyn std::error::Error>> {
    let f = File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    Ok(BufReader::new(f))
}

fn load_corpus(path: &Path) -> Result<Corpus, Box<dyn std::error::Error>> {
    info!(?path, "loading corpus");
    let corpus = Corpus::read(open(path)?)?;
    info!(n_sequences = corpus.len(), "loaded corpus");
    Ok(corpus)
}

fn create_parent_dirs(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();

    let train = load_corpus(&args.train)?;
    let test = load_corpus(&args.test)?;
    let feature_set = FeatureSet::read_config(open(&args.features)?)?;
    info!(features = ?feature_set.names(), "loaded feature configuration");

    let decode_mode = if args.greedy {
        DecodeMode::Greedy
    } else {
        DecodeMode::Optimal
    };
    let mut perceptron = Perceptron::new(feature_set, decode_mode, !args.no_average);

    let accuracies = perceptron.train(args.iterations, &train, args.debug);
    println!("Training accuracy:");
    for (i, accuracy) in accuracies.iter().enumerate() {
        println!("{}\t{}", i + 1, accuracy);
    }

    create_parent_dirs(&args.output)?;
    let mut f = BufWriter::new(File::create(&args.output)?);
    let accuracy = perceptron.test(&test, &mut f)?;
    f.flush()?;
    println!("Testing accuracy:");
    println!("{}", accuracy);

    if let Some(path) = args.model {
        info!(?path, "writing model");
        create_parent_dirs(&path)?;
        let mut f = zstd::Encoder::new(File::create(path)?, 19)?;
        f.multithread(args.zstd_workers)?;
        perceptron.model().write(&mut f)?;
        f.finish()?;
    }

    println!("Elapsed: {} [sec]", start.elapsed().as_secs_f64());
    Ok(())
}

fn main() {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(args) {
        eprintln!("{e}");
        process::exit(1);
    }
}
