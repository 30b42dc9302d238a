use std::fs::{self, File};
use std::io::{prelude::*, stdin, stdout, BufReader, BufWriter};
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use clap::Parser;
use codeswitchador::{write_sequence, Corpus, DecodeMode, Model, Tagger};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(about = "A program to tag a corpus with a trained model.")]
struct Args {
    /// The model file to use when tagging
    model: PathBuf,

    /// The corpus to tag (stdin if omitted)
    input: Option<PathBuf>,

    /// The file to write the tagged corpus to (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Override the decode mode stored in the model: {greedy, optimal}
    #[arg(long)]
    decode: Option<DecodeMode>,
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    info!(path = ?args.model, "loading model file");
    let f = File::open(&args.model).map_err(|e| format!("{}: {e}", args.model.display()))?;
    let mut f = zstd::Decoder::new(f)?;
    let model = Model::read(&mut f)?;
    info!(
        n_labels = model.labels().len(),
        n_features = model.n_features(),
        "loaded model"
    );
    let mut tagger = Tagger::new(model)?;
    if let Some(decode_mode) = args.decode {
        tagger = tagger.decode_mode(decode_mode);
    }

    let corpus = match &args.input {
        Some(path) => {
            let f = File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
            Corpus::read(BufReader::new(f))?
        }
        None => Corpus::read(stdin().lock())?,
    };

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            Box::new(BufWriter::new(File::create(path)?))
        }
        None => Box::new(BufWriter::new(stdout().lock())),
    };

    info!(n_sequences = corpus.len(), "start tagging");
    let start = Instant::now();
    let mut n_tokens = 0;
    for seq in &corpus {
        let predicted = tagger.predict(seq);
        n_tokens += predicted.len();
        write_sequence(&mut out, &predicted)?;
    }
    out.flush()?;
    let duration = start.elapsed();
    info!(
        elapsed = duration.as_secs_f64(),
        tokens_per_sec = n_tokens as f64 / duration.as_secs_f64(),
        "finished tagging"
    );

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
