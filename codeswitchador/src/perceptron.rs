use std::io::Write;

use tracing::{debug, info};

use crate::corpus::{self, Corpus};
use crate::decode::{self, DecodeMode};
use crate::errors::Result;
use crate::feature::FeatureSet;
use crate::model::Model;
use crate::tagger::Tagger;
use crate::utils::Indexer;

/// A weight with the bookkeeping needed for lazy averaging.
///
/// `total` holds the sum of the weight over the first `stamp` steps.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Param {
    weight: f64,
    total: f64,
    stamp: u32,
}

impl Param {
    fn update(&mut self, delta: f64, step: u32) {
        self.total += self.weight * f64::from(step - self.stamp);
        self.stamp = step;
        self.weight += delta;
    }

    /// Mean of the weight over `n_steps` steps.
    fn averaged(&self, n_steps: u32) -> f64 {
        if n_steps == 0 {
            return self.weight;
        }
        (self.total + self.weight * f64::from(n_steps - self.stamp)) / f64::from(n_steps)
    }
}

/// Structured perceptron trainer.
///
/// # Examples
///
/// ```
/// use codeswitchador::{Corpus, DecodeMode, FeatureSet, Perceptron};
///
/// let corpus = Corpus::read("the\te\ncat\te\n\nel\ts\ngato\ts\n".as_bytes()).unwrap();
/// let feature_set = FeatureSet::from_names(["token-1", "token", "token+1"]).unwrap();
///
/// let mut perceptron = Perceptron::new(feature_set, DecodeMode::Optimal, true);
/// let accuracies = perceptron.train(5, &corpus, false);
/// assert_eq!(5, accuracies.len());
///
/// let mut output = vec![];
/// let accuracy = perceptron.test(&corpus, &mut output).unwrap();
/// assert!((0.0..=1.0).contains(&accuracy));
/// ```
pub struct Perceptron {
    feature_set: FeatureSet,
    decode_mode: DecodeMode,
    averaged: bool,
    labels: Indexer<String>,
    features: Indexer<String>,

    /// `weights[feature][label]`
    weights: Vec<Vec<Param>>,

    /// `transitions[prev][label]`
    transitions: Vec<Vec<Param>>,
    start: Vec<Param>,

    /// Number of training sequences seen so far.
    n_steps: u32,
}

impl Perceptron {
    /// Creates a new trainer.
    ///
    /// # Arguments
    ///
    /// * `feature_set` - Feature generators.
    /// * `decode_mode` - Decoding strategy used in training and testing.
    /// * `averaged` - Test with the mean of the weights after every training sequence instead of
    ///   the final weights.
    pub fn new(feature_set: FeatureSet, decode_mode: DecodeMode, averaged: bool) -> Self {
        Self {
            feature_set,
            decode_mode,
            averaged,
            labels: Indexer::new(),
            features: Indexer::new(),
            weights: vec![],
            transitions: vec![],
            start: vec![],
            n_steps: 0,
        }
    }

    pub fn n_labels(&self) -> usize {
        self.labels.len()
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    fn register_labels(&mut self, corpus: &Corpus) {
        for seq in corpus {
            for record in seq {
                self.labels.get_or_insert(record.tag.as_str());
            }
        }
        let n_labels = self.labels.len();
        for row in &mut self.weights {
            row.resize(n_labels, Param::default());
        }
        for row in &mut self.transitions {
            row.resize(n_labels, Param::default());
        }
        self.transitions
            .resize(n_labels, vec![Param::default(); n_labels]);
        self.start.resize(n_labels, Param::default());
    }

    fn feature_ids(&mut self, features: Vec<Vec<String>>) -> Vec<Vec<usize>> {
        let n_labels = self.labels.len();
        let mut result = Vec::with_capacity(features.len());
        for fs in features {
            let mut ids = Vec::with_capacity(fs.len());
            for f in fs {
                let id = self.features.get_or_insert(f.as_str());
                if id == self.weights.len() {
                    self.weights.push(vec![Param::default(); n_labels]);
                }
                ids.push(id);
            }
            result.push(ids);
        }
        result
    }

    fn emission_scores(&self, feature_ids: &[Vec<usize>]) -> Vec<Vec<f64>> {
        feature_ids
            .iter()
            .map(|ids| {
                let mut scores = vec![0.0; self.labels.len()];
                for &id in ids {
                    for (s, p) in scores.iter_mut().zip(&self.weights[id]) {
                        *s += p.weight;
                    }
                }
                scores
            })
            .collect()
    }

    fn transition_scores(&self) -> Vec<Vec<f64>> {
        self.transitions
            .iter()
            .chain([&self.start])
            .map(|row| row.iter().map(|p| p.weight).collect())
            .collect()
    }

    fn transition_mut(&mut self, prev: Option<usize>, label: usize) -> &mut Param {
        match prev {
            Some(prev) => &mut self.transitions[prev][label],
            None => &mut self.start[label],
        }
    }

    /// Moves the weights from the predicted labels toward the gold labels.
    fn update(&mut self, feature_ids: &[Vec<usize>], gold: &[usize], predicted: &[usize]) {
        let step = self.n_steps;
        for (i, ids) in feature_ids.iter().enumerate() {
            if gold[i] != predicted[i] {
                for &id in ids {
                    self.weights[id][gold[i]].update(1.0, step);
                    self.weights[id][predicted[i]].update(-1.0, step);
                }
            }
            let gold_prev = i.checked_sub(1).map(|j| gold[j]);
            let predicted_prev = i.checked_sub(1).map(|j| predicted[j]);
            if (gold_prev, gold[i]) != (predicted_prev, predicted[i]) {
                self.transition_mut(gold_prev, gold[i]).update(1.0, step);
                self.transition_mut(predicted_prev, predicted[i])
                    .update(-1.0, step);
            }
        }
    }

    /// Trains the weights.
    ///
    /// Each iteration is one pass over `corpus` in order. Every sequence is decoded with the
    /// current weights and the weights are then updated where the prediction was wrong.
    ///
    /// # Arguments
    ///
    /// * `iterations` - Number of passes.
    /// * `corpus` - Training sequences.
    /// * `debug` - Log the number of mistakes of every sequence.
    ///
    /// # Returns
    ///
    /// Token accuracy of each pass, measured before each sequence's update. An empty corpus gives
    /// zero.
    pub fn train(&mut self, iterations: usize, corpus: &Corpus, debug: bool) -> Vec<f64> {
        self.register_labels(corpus);
        let mut examples = Vec::with_capacity(corpus.len());
        for seq in corpus {
            let features = self.feature_set.extract(seq);
            let feature_ids = self.feature_ids(features);
            let gold: Vec<usize> = seq
                .iter()
                .filter_map(|r| self.labels.get(r.tag.as_str()))
                .collect();
            examples.push((feature_ids, gold));
        }
        info!(
            n_sequences = examples.len(),
            n_labels = self.labels.len(),
            n_features = self.features.len(),
            "start training"
        );

        let mut accuracies = Vec::with_capacity(iterations);
        for iteration in 0..iterations {
            let mut hits = 0usize;
            let mut total = 0usize;
            for (i, (feature_ids, gold)) in examples.iter().enumerate() {
                let emissions = self.emission_scores(feature_ids);
                let predicted =
                    decode::decode(self.decode_mode, &emissions, &self.transition_scores());
                let mistakes = gold.iter().zip(&predicted).filter(|(g, p)| g != p).count();
                hits += gold.len() - mistakes;
                total += gold.len();
                if debug {
                    debug!(iteration = iteration + 1, sequence = i + 1, mistakes, "decoded");
                }
                if mistakes != 0 {
                    self.update(feature_ids, gold, &predicted);
                }
                self.n_steps += 1;
            }
            let accuracy = if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            };
            info!(iteration = iteration + 1, accuracy, "finished iteration");
            accuracies.push(accuracy);
        }
        accuracies
    }

    /// Freezes the current weights into a [`Model`].
    ///
    /// The averaged weights are used when averaging is enabled. Features whose weights are all
    /// zero are dropped.
    pub fn model(&self) -> Model {
        let value = |p: &Param| {
            if self.averaged {
                p.averaged(self.n_steps)
            } else {
                p.weight
            }
        };
        let mut features = vec![];
        let mut weights = vec![];
        for (feature, row) in self.features.keys().iter().zip(&self.weights) {
            let row: Vec<f64> = row.iter().map(value).collect();
            if row.iter().any(|&w| w != 0.0) {
                features.push(feature.clone());
                weights.push(row);
            }
        }
        let transitions = self
            .transitions
            .iter()
            .chain([&self.start])
            .map(|row| row.iter().map(value).collect())
            .collect();
        Model {
            labels: self.labels.keys().to_vec(),
            features,
            weights,
            transitions,
            feature_names: self.feature_set.names().to_vec(),
            decode_mode: self.decode_mode,
        }
    }

    /// Tags `corpus`, writes the tagged sequences to `sink` and returns the token accuracy
    /// against the tags in `corpus`.
    ///
    /// # Errors
    ///
    /// [`CodeswitchError::InvalidModel`](crate::errors::CodeswitchError::InvalidModel) is
    /// returned if nothing was trained, and write errors of `sink` are returned as is.
    pub fn test<W>(&self, corpus: &Corpus, sink: &mut W) -> Result<f64>
    where
        W: Write,
    {
        let tagger = Tagger::new(self.model())?;
        let mut hits = 0usize;
        let mut total = 0usize;
        for seq in corpus {
            let predicted = tagger.predict(seq);
            hits += seq
                .iter()
                .zip(&predicted)
                .filter(|(g, p)| g.tag == p.tag)
                .count();
            total += seq.len();
            corpus::write_sequence(sink, &predicted)?;
        }
        Ok(if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRAIN: &str = "\
the\te\ncat\te\n\n\
el\ts\ngato\ts\n\n\
the\te\ngato\ts\n\n\
el\ts\ncat\te\n\n";

    fn corpus(text: &str) -> Corpus {
        Corpus::read(text.as_bytes()).unwrap()
    }

    fn perceptron(decode_mode: DecodeMode, averaged: bool) -> Perceptron {
        let feature_set = FeatureSet::from_names(["token-1", "token", "token+1"]).unwrap();
        Perceptron::new(feature_set, decode_mode, averaged)
    }

    #[test]
    fn test_param_average() {
        // Snapshots after each of three steps: 1, 1, 0.
        let mut p = Param::default();
        p.update(1.0, 0);
        p.update(-1.0, 2);

        assert_eq!(0.0, p.weight);
        assert!((p.averaged(3) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(0.0, Param::default().averaged(0));
    }

    #[test]
    fn test_train_empty_corpus() {
        let mut p = perceptron(DecodeMode::Optimal, true);
        let accuracies = p.train(3, &Corpus::default(), false);

        assert_eq!(vec![0.0, 0.0, 0.0], accuracies);
    }

    #[test]
    fn test_train_converges() {
        let c = corpus(TRAIN);
        let mut p = perceptron(DecodeMode::Optimal, false);
        let accuracies = p.train(60, &c, false);

        assert_eq!(60, accuracies.len());
        assert_eq!(1.0, *accuracies.last().unwrap());
        assert_eq!(2, p.n_labels());

        let mut output = vec![];
        assert_eq!(1.0, p.test(&c, &mut output).unwrap());
        assert_eq!(TRAIN, String::from_utf8(output).unwrap());
    }

    #[test]
    fn test_first_iteration_accuracy() {
        // All weights start at zero, so both sequences are tagged with the first label `s`.
        let c = corpus("el\ts\n\nthe\te\n");
        let mut p = perceptron(DecodeMode::Greedy, false);
        let accuracies = p.train(1, &c, false);
        assert_eq!(vec![0.5], accuracies);
    }

    #[test]
    fn test_train_and_test_deterministic() {
        let c = corpus(TRAIN);
        let test = corpus("the\te\ngato\ts\ncat\te\n\nel\ts\nperro\ts\n");

        let mut runs = vec![];
        for _ in 0..2 {
            let mut p = perceptron(DecodeMode::Greedy, true);
            let accuracies = p.train(4, &c, true);
            let mut output = vec![];
            let accuracy = p.test(&test, &mut output).unwrap();
            runs.push((accuracies, accuracy, output));
        }

        assert_eq!(runs[0], runs[1]);
        let accuracy = runs[0].1;
        assert!((0.0..=1.0).contains(&accuracy));
    }

    #[test]
    fn test_test_without_training() {
        let p = perceptron(DecodeMode::Optimal, true);
        let mut output = vec![];

        assert!(p.test(&corpus(TRAIN), &mut output).is_err());
    }

    #[test]
    fn test_model_drops_zero_features() {
        let c = corpus(TRAIN);
        let mut p = perceptron(DecodeMode::Optimal, true);
        p.train(1, &c, false);
        let model = p.model();

        assert!(model.n_features() <= p.n_features());
        assert_eq!(&["e".to_string(), "s".to_string()], model.labels());
        assert_eq!(&["token-1", "token", "token+1"], model.feature_names());
        assert_eq!(3, model.transitions.len());
    }
}
