//! Accuracy of predicted tags against gold tags.

use std::collections::BTreeMap;
use std::fmt;

use hashbrown::HashMap;
use tracing::warn;

use crate::corpus::Corpus;
use crate::errors::{CodeswitchError, Result};

/// Counts of one gold label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelStatistics {
    pub hits: usize,
    pub misses: usize,

    /// `hits + misses`
    pub count: usize,

    /// `hits / count`
    pub accuracy: f64,
}

/// Results of [`SequenceEvaluator::eval`].
///
/// Rates with a zero denominator are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationStatistics {
    pub hits: usize,
    pub misses: usize,
    pub total: usize,
    pub accuracy: f64,

    /// Number of scored gold tokens missing from the vocabulary.
    pub oov: usize,
    pub oov_hits: usize,
    pub oov_misses: usize,

    /// `oov / total`
    pub oov_rate: f64,

    /// `oov_hits / oov`
    pub oov_accuracy: f64,

    /// Per gold label, in lexicographic order.
    pub labels: BTreeMap<String, LabelStatistics>,
}

impl EvaluationStatistics {
    /// Share of scored tokens whose gold label is `label`.
    pub fn label_frequency(&self, label: &str) -> Option<f64> {
        self.labels
            .get(label)
            .map(|s| s.count as f64 / self.total as f64)
    }
}

impl fmt::Display for EvaluationStatistics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "Accuracy: {} ({}/{})",
            self.accuracy, self.hits, self.total
        )?;
        writeln!(
            f,
            "OOV accuracy: {} ({}/{})",
            self.oov_accuracy, self.oov_hits, self.oov
        )?;
        writeln!(f, "OOV rate: {} ({}/{})", self.oov_rate, self.oov, self.total)?;
        writeln!(f, "Class accuracies:")?;
        for (label, stats) in &self.labels {
            writeln!(f, "{}: {}", label, stats.accuracy)?;
        }
        writeln!(f)?;
        writeln!(f, "Data balance:")?;
        for (label, stats) in &self.labels {
            writeln!(
                f,
                "{}: {} ({}/{})",
                label,
                stats.count as f64 / self.total as f64,
                stats.count,
                self.total
            )?;
        }
        Ok(())
    }
}

/// A gold/predicted pair that was not scored because the lengths differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceMismatch {
    /// 1-based sequence number.
    pub index: usize,
    pub gold_len: usize,
    pub predicted_len: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub statistics: EvaluationStatistics,
    pub skipped: Vec<SequenceMismatch>,
}

/// Compares a predicted corpus with a gold corpus.
pub struct SequenceEvaluator<'a> {
    gold: &'a Corpus,
    predicted: &'a Corpus,
    vocabulary: Option<&'a Corpus>,
}

impl<'a> SequenceEvaluator<'a> {
    /// Creates a new evaluator.
    ///
    /// # Arguments
    ///
    /// * `gold` - Correct tags.
    /// * `predicted` - Predicted tags.
    /// * `vocabulary` - Training data whose tokens define the in-vocabulary set. Without it no
    ///   token is counted as OOV.
    ///
    /// # Errors
    ///
    /// [`CodeswitchError::InvalidArgument`] is returned when `gold` and `predicted` have different
    /// numbers of sequences.
    pub fn new(
        gold: &'a Corpus,
        predicted: &'a Corpus,
        vocabulary: Option<&'a Corpus>,
    ) -> Result<Self> {
        if gold.len() != predicted.len() {
            return Err(CodeswitchError::invalid_argument(
                "predicted",
                format!(
                    "gold and predicted corpora are not the same size: {} != {}",
                    gold.len(),
                    predicted.len()
                ),
            ));
        }
        Ok(Self {
            gold,
            predicted,
            vocabulary,
        })
    }

    fn build_vocabulary(&self) -> Option<HashMap<&'a str, usize>> {
        let corpus = self.vocabulary?;
        let mut counts = HashMap::new();
        for seq in corpus {
            for record in seq {
                *counts.entry(record.token.lower()).or_insert(0) += 1;
            }
        }
        Some(counts)
    }

    /// Scores every aligned token pair.
    ///
    /// # Arguments
    ///
    /// * `ignore_comment` - Skip gold tokens carrying a comment.
    ///
    /// # Returns
    ///
    /// The statistics and the sequences skipped because their lengths differ.
    pub fn eval(&self, ignore_comment: bool) -> Evaluation {
        let vocabulary = self.build_vocabulary();

        let mut hits = 0;
        let mut misses = 0;
        let mut oov = 0;
        let mut oov_hits = 0;
        let mut oov_misses = 0;
        let mut label_counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        let mut skipped = vec![];

        for (i, (gold_seq, pred_seq)) in self.gold.iter().zip(self.predicted).enumerate() {
            if gold_seq.len() != pred_seq.len() {
                warn!(
                    sequence = i + 1,
                    gold_len = gold_seq.len(),
                    predicted_len = pred_seq.len(),
                    "sequences not same length; skipped"
                );
                skipped.push(SequenceMismatch {
                    index: i + 1,
                    gold_len: gold_seq.len(),
                    predicted_len: pred_seq.len(),
                });
                continue;
            }
            for (gold, pred) in gold_seq.iter().zip(pred_seq) {
                if ignore_comment && gold.comment.is_some() {
                    continue;
                }
                let hit = gold.tag == pred.tag;
                let counts = label_counts.entry(gold.tag.as_str()).or_default();
                if hit {
                    hits += 1;
                    counts.0 += 1;
                } else {
                    misses += 1;
                    counts.1 += 1;
                }
                if let Some(vocabulary) = vocabulary.as_ref() {
                    if !vocabulary.contains_key(gold.token.surface()) {
                        oov += 1;
                        if hit {
                            oov_hits += 1;
                        } else {
                            oov_misses += 1;
                        }
                    }
                }
            }
        }

        let total = hits + misses;
        let labels = label_counts
            .into_iter()
            .map(|(label, (hits, misses))| {
                let count = hits + misses;
                (
                    label.to_string(),
                    LabelStatistics {
                        hits,
                        misses,
                        count,
                        accuracy: hits as f64 / count as f64,
                    },
                )
            })
            .collect();
        Evaluation {
            statistics: EvaluationStatistics {
                hits,
                misses,
                total,
                accuracy: hits as f64 / total as f64,
                oov,
                oov_hits,
                oov_misses,
                oov_rate: oov as f64 / total as f64,
                oov_accuracy: oov_hits as f64 / oov as f64,
                labels,
            },
            skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(text: &str) -> Corpus {
        Corpus::read(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_eval_single_token() {
        let gold = corpus("hola\ts\n");
        let pred = corpus("hola\ts\n");
        let evaluation = SequenceEvaluator::new(&gold, &pred, None).unwrap().eval(false);
        let stats = evaluation.statistics;

        assert_eq!(1.0, stats.accuracy);
        assert_eq!(0, stats.oov);
        assert_eq!(0.0, stats.oov_rate);
        assert!(stats.oov_accuracy.is_nan());
        assert!(evaluation.skipped.is_empty());
    }

    #[test]
    fn test_eval_corpus_size_mismatch() {
        let gold = corpus("a\te\n\nb\ts\n");
        let pred = corpus("a\te\n");
        let result = SequenceEvaluator::new(&gold, &pred, None);

        assert!(result.is_err());
        assert_eq!(
            "InvalidArgumentError: predicted: gold and predicted corpora are not the same size: 2 != 1",
            result.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_eval_skips_length_mismatch() {
        let gold = corpus("a\te\nb\te\n\nc\ts\nd\ts\n\ne\tn\n");
        let pred = corpus("a\te\nb\ts\n\nc\ts\n\ne\tn\n");
        let evaluation = SequenceEvaluator::new(&gold, &pred, None).unwrap().eval(false);

        assert_eq!(
            vec![SequenceMismatch {
                index: 2,
                gold_len: 2,
                predicted_len: 1,
            }],
            evaluation.skipped
        );
        let stats = evaluation.statistics;
        assert_eq!(2, stats.hits);
        assert_eq!(1, stats.misses);
        assert_eq!(3, stats.total);
        assert!(!stats.labels.contains_key("s"));
    }

    #[test]
    fn test_eval_ignore_comment() {
        let gold = corpus("a\te\n:)\tn\temoticon\nb\ts\n");
        let pred = corpus("a\te\n:)\te\nb\ts\n");

        let stats = SequenceEvaluator::new(&gold, &pred, None)
            .unwrap()
            .eval(true)
            .statistics;
        assert_eq!(1.0, stats.accuracy);
        assert_eq!(2, stats.total);

        let stats = SequenceEvaluator::new(&gold, &pred, None)
            .unwrap()
            .eval(false)
            .statistics;
        assert_eq!(2, stats.hits);
        assert_eq!(3, stats.total);
    }

    #[test]
    fn test_eval_oov() {
        let train = corpus("Hola\ts\namigo\ts\n\nthe\te\n");
        let gold = corpus("hola\ts\nHola\ts\nthe\te\ncat\te\n");
        let pred = corpus("hola\ts\nHola\te\nthe\te\ncat\ts\n");
        let stats = SequenceEvaluator::new(&gold, &pred, Some(&train))
            .unwrap()
            .eval(false)
            .statistics;

        // The vocabulary is lowercase and the lookup is not, so `Hola` is OOV.
        assert_eq!(2, stats.oov);
        assert_eq!(0, stats.oov_hits);
        assert_eq!(2, stats.oov_misses);
        assert_eq!(0.5, stats.oov_rate);
        assert_eq!(0.0, stats.oov_accuracy);
    }

    #[test]
    fn test_eval_label_statistics() {
        let gold = corpus("a\te\nb\te\nc\ts\nd\tn\n");
        let pred = corpus("a\te\nb\ts\nc\te\nd\tn\n");
        let stats = SequenceEvaluator::new(&gold, &pred, None)
            .unwrap()
            .eval(false)
            .statistics;

        assert_eq!(
            vec!["e", "n", "s"],
            stats.labels.keys().map(String::as_str).collect::<Vec<_>>()
        );
        assert_eq!(
            LabelStatistics {
                hits: 1,
                misses: 1,
                count: 2,
                accuracy: 0.5,
            },
            stats.labels["e"]
        );
        assert_eq!(0.0, stats.labels["s"].accuracy);
        assert_eq!(Some(0.5), stats.label_frequency("e"));
        assert_eq!(None, stats.label_frequency("x"));
    }

    #[test]
    fn test_statistics_display() {
        let train = corpus("a\te\n");
        let gold = corpus("a\te\nb\ts\n");
        let pred = corpus("a\te\nb\te\n");
        let stats = SequenceEvaluator::new(&gold, &pred, Some(&train))
            .unwrap()
            .eval(false)
            .statistics;

        assert_eq!(
            "\
Accuracy: 0.5 (1/2)
OOV accuracy: 0 (0/1)
OOV rate: 0.5 (1/2)
Class accuracies:
e: 1
s: 0

Data balance:
e: 0.5 (1/2)
s: 0.5 (1/2)
",
            stats.to_string()
        );
    }
}
