//! # Codeswitchador
//!
//! Codeswitchador labels each token of code-switched text with its language.
//!
//! It provides a structured perceptron tagger over pluggable feature generators, a counting
//! estimator of Markov state parameters, and an evaluator of predicted tags.
//!
//! ## Examples
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::{stdout, BufReader};
//!
//! use codeswitchador::{Corpus, DecodeMode, FeatureSet, Perceptron};
//!
//! let train = Corpus::read(BufReader::new(File::open("train.tsv").unwrap())).unwrap();
//! let test = Corpus::read(BufReader::new(File::open("test.tsv").unwrap())).unwrap();
//! let features = FeatureSet::read_config(BufReader::new(File::open("features.txt").unwrap())).unwrap();
//!
//! let mut perceptron = Perceptron::new(features, DecodeMode::Optimal, true);
//! for (i, accuracy) in perceptron.train(10, &train, false).iter().enumerate() {
//!     println!("{}\t{}", i + 1, accuracy);
//! }
//! let accuracy = perceptron.test(&test, &mut stdout().lock()).unwrap();
//! eprintln!("Testing accuracy: {}", accuracy);
//! ```

mod utils;

mod corpus;
mod decode;
mod estimator;
mod evaluator;
mod feature;
mod model;
mod perceptron;
mod tagger;

pub mod errors;

pub use corpus::{write_sequence, Corpus, Sequence, TagViolation, Token, TokenState, TokenTag};
pub use decode::DecodeMode;
pub use estimator::{
    compute_state_probabilities, ChainPolicy, StateProbabilities, TokenCounts, SUM_TOLERANCE,
};
pub use evaluator::{
    Evaluation, EvaluationStatistics, LabelStatistics, SequenceEvaluator, SequenceMismatch,
};
pub use feature::{
    CharNgramFeature, CharTypeFeature, CharacterType, FeatureGenerator, FeatureSet,
    TokenContextFeature, WordListFeature,
};
pub use model::Model;
pub use perceptron::Perceptron;
pub use tagger::Tagger;
