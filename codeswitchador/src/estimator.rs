//! Counting estimator of first-order Markov state parameters.

use hashbrown::{HashMap, HashSet};

use crate::corpus::Corpus;
use crate::errors::{CodeswitchError, Result};

/// Tolerance of the sum-to-one checks.
pub const SUM_TOLERANCE: f64 = 1e-9;

/// How a skipped non-state record affects the transition chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainPolicy {
    /// The skipped record becomes the previous record, so the edge into the next retained
    /// record is not counted.
    #[default]
    BreakAtSkip,

    /// The skipped record is invisible, so the edge runs from the last retained state to the
    /// next retained state.
    CarryAcross,
}

/// Occurrence counts of lowercase tokens for one state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenCounts {
    counts: HashMap<String, u32>,
    total: u32,
}

impl TokenCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, token: &str, n: u32) {
        if let Some(count) = self.counts.get_mut(token) {
            *count += n;
        } else {
            self.counts.insert(token.to_string(), n);
        }
        self.total += n;
    }

    pub fn count(&self, token: &str) -> u32 {
        self.counts.get(token).copied().unwrap_or(0)
    }

    /// Sum of all counts.
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// `count / total`; NaN if nothing was counted.
    pub fn emission_probability(&self, token: &str) -> f64 {
        f64::from(self.count(token)) / f64::from(self.total)
    }

    /// Iterates over `(token, count)` sorted by token.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        let mut entries: Vec<_> = self.counts.iter().map(|(t, &c)| (t.as_str(), c)).collect();
        entries.sort_unstable();
        entries.into_iter()
    }
}

/// Initial probabilities and the transition matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct StateProbabilities {
    /// `pi[i]`: probability that a sequence starts in state `i`.
    pub pi: Vec<f64>,

    /// `a[i][j]`: probability of moving from state `i` to state `j`.
    pub a: Vec<Vec<f64>>,
}

impl StateProbabilities {
    /// Checks that `pi` and every row of `a` sum to one.
    ///
    /// # Errors
    ///
    /// [`CodeswitchError::Integrity`] is returned for the first failing row, then for `pi`.
    pub fn check(&self) -> Result<()> {
        for (i, row) in self.a.iter().enumerate() {
            if !sums_to_one(row) {
                return Err(CodeswitchError::integrity(format!(
                    "transitions out of state {i} do not sum to one"
                )));
            }
        }
        if !sums_to_one(&self.pi) {
            return Err(CodeswitchError::integrity(
                "initial states do not sum to one",
            ));
        }
        Ok(())
    }
}

fn sums_to_one(xs: &[f64]) -> bool {
    let sum: f64 = xs.iter().sum();
    // NaN fails the comparison.
    (sum - 1.0).abs() <= SUM_TOLERANCE
}

/// Computes initial and transition probabilities over a training corpus.
///
/// # Arguments
///
/// * `corpus` - Training sequences; the tag of each record is its state.
/// * `states` - The ordered states.
/// * `non_states` - Labels excluded from counting.
/// * `emissions` - Per-state token counts in the same order as `states`, incremented for every
///   retained record.
/// * `policy` - How skipped records affect transitions.
///
/// # Errors
///
/// * [`CodeswitchError::InvalidArgument`] when `emissions` has the wrong length or a retained
///   record carries a state outside `states`.
/// * [`CodeswitchError::Integrity`] when the result does not sum to one, e.g. a state that never
///   starts a sequence or never precedes another state leaves a NaN row.
pub fn compute_state_probabilities<S>(
    corpus: &Corpus,
    states: &[S],
    non_states: &[S],
    mut emissions: Option<&mut [TokenCounts]>,
    policy: ChainPolicy,
) -> Result<StateProbabilities>
where
    S: AsRef<str>,
{
    let n_states = states.len();
    let state_ids: HashMap<&str, usize> = states
        .iter()
        .enumerate()
        .map(|(i, s)| (s.as_ref(), i))
        .collect();
    let non_states: HashSet<&str> = non_states.iter().map(AsRef::as_ref).collect();
    if let Some(emissions) = emissions.as_deref() {
        if emissions.len() != n_states {
            return Err(CodeswitchError::invalid_argument(
                "emissions",
                format!("expected {} entries, got {}", n_states, emissions.len()),
            ));
        }
    }

    let mut init_counts = vec![0u32; n_states];
    let mut init_total = 0u32;
    let mut trans_counts = vec![vec![0u32; n_states]; n_states];
    let mut from_counts = vec![0u32; n_states];

    for seq in corpus {
        let mut first = true;
        // `None` after a skipped record under `BreakAtSkip`.
        let mut prev: Option<usize> = None;
        for record in seq {
            if non_states.contains(record.state()) {
                if policy == ChainPolicy::BreakAtSkip {
                    prev = None;
                }
                continue;
            }
            let state = *state_ids.get(record.state()).ok_or_else(|| {
                CodeswitchError::invalid_argument(
                    "states",
                    format!("state `{}` is neither a state nor a non-state", record.state()),
                )
            })?;
            if first {
                init_counts[state] += 1;
                init_total += 1;
                first = false;
            } else if let Some(prev) = prev {
                trans_counts[prev][state] += 1;
                from_counts[prev] += 1;
            }
            prev = Some(state);

            if let Some(emissions) = emissions.as_deref_mut() {
                emissions[state].increment(record.token.lower(), 1);
            }
        }
    }

    let pi = init_counts
        .iter()
        .map(|&c| f64::from(c) / f64::from(init_total))
        .collect();
    let a = trans_counts
        .iter()
        .zip(&from_counts)
        .map(|(row, &from)| {
            row.iter()
                .map(|&c| f64::from(c) / f64::from(from))
                .collect()
        })
        .collect();
    let probs = StateProbabilities { pi, a };
    probs.check()?;
    Ok(probs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(text: &str) -> Corpus {
        Corpus::read(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_estimate_sums_to_one() {
        let c = corpus("a\tA\nb\tA\nc\tB\n\nd\tB\ne\tA\nf\tB\ng\tB\n\nh\tA\ni\tB\nj\tA\n");
        let probs = compute_state_probabilities(&c, &["A", "B"], &[], None, ChainPolicy::default())
            .unwrap();

        assert_eq!(vec![2.0 / 3.0, 1.0 / 3.0], probs.pi);
        // A->A 1, A->B 3, B->A 2, B->B 1
        assert_eq!(vec![0.25, 0.75], probs.a[0]);
        assert_eq!(vec![2.0 / 3.0, 1.0 / 3.0], probs.a[1]);
        for row in &probs.a {
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_estimate_break_at_skip() {
        let c = corpus("w\tA\nx\tX\ny\tB\nz\tA\n\nu\tB\nv\tA\nw\tB\n");
        let mut emissions = vec![TokenCounts::new(), TokenCounts::new()];
        let probs = compute_state_probabilities(
            &c,
            &["A", "B"],
            &["X"],
            Some(&mut emissions),
            ChainPolicy::BreakAtSkip,
        )
        .unwrap();

        // Counted edges: B->A, B->A, A->B. A->B across X is dropped.
        assert_eq!(vec![0.5, 0.5], probs.pi);
        assert_eq!(vec![0.0, 1.0], probs.a[0]);
        assert_eq!(vec![1.0, 0.0], probs.a[1]);
        assert_eq!(3, emissions[0].total());
        assert_eq!(1, emissions[0].count("w"));
        assert_eq!(1, emissions[1].count("w"));
        assert_eq!(0, emissions[0].count("x"));
        assert_eq!(0, emissions[1].count("x"));
    }

    #[test]
    fn test_estimate_carry_across() {
        let c = corpus("w\tA\nx\tX\ny\tB\nz\tA\n\nu\tB\nv\tA\nw\tA\n");
        let probs = compute_state_probabilities(
            &c,
            &["A", "B"],
            &["X"],
            None,
            ChainPolicy::CarryAcross,
        )
        .unwrap();

        // Counted edges: A->B (across X), B->A, B->A, A->A.
        assert_eq!(vec![0.5, 0.5], probs.pi);
        assert_eq!(vec![0.5, 0.5], probs.a[0]);
        assert_eq!(vec![1.0, 0.0], probs.a[1]);
    }

    #[test]
    fn test_estimate_init_after_leading_skip() {
        let c = corpus("x\tX\nw\tA\ny\tB\n\nz\tB\nv\tA\n");
        let probs =
            compute_state_probabilities(&c, &["A", "B"], &["X"], None, ChainPolicy::BreakAtSkip)
                .unwrap();

        assert_eq!(vec![0.5, 0.5], probs.pi);
    }

    #[test]
    fn test_estimate_state_never_a_source() {
        let c = corpus("w\tA\ny\tB\n");
        let result = compute_state_probabilities(&c, &["A", "B"], &[], None, ChainPolicy::default());

        assert!(result.is_err());
        assert_eq!(
            "IntegrityError: transitions out of state 1 do not sum to one",
            result.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_estimate_incomplete_state_list() {
        let c = corpus("w\tA\ny\tC\n");
        let result = compute_state_probabilities(&c, &["A", "B"], &[], None, ChainPolicy::default());

        assert!(result.is_err());
        assert_eq!(
            "InvalidArgumentError: states: state `C` is neither a state nor a non-state",
            result.err().unwrap().to_string()
        );
    }

    #[test]
    fn test_estimate_emissions_length() {
        let c = corpus("w\tA\n");
        let mut emissions = vec![TokenCounts::new()];
        let result = compute_state_probabilities(
            &c,
            &["A", "B"],
            &[],
            Some(&mut emissions),
            ChainPolicy::default(),
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_check_detects_bad_pi() {
        let probs = StateProbabilities {
            pi: vec![0.5, 0.4],
            a: vec![vec![1.0, 0.0], vec![0.3, 0.7]],
        };

        assert_eq!(
            "IntegrityError: initial states do not sum to one",
            probs.check().err().unwrap().to_string()
        );
    }

    #[test]
    fn test_token_counts() {
        let mut counts = TokenCounts::new();
        counts.increment("hola", 1);
        counts.increment("amigo", 1);
        counts.increment("hola", 2);

        assert_eq!(4, counts.total());
        assert_eq!(2, counts.len());
        assert_eq!(0.75, counts.emission_probability("hola"));
        assert_eq!(vec![("amigo", 1), ("hola", 3)], counts.iter().collect::<Vec<_>>());
        assert!(TokenCounts::new().emission_probability("hola").is_nan());
    }
}
