//! Label sequence decoding.
//!
//! Both decoders take `emissions[position][label]` and `transitions[prev][label]`, where
//! `transitions` has one extra last row holding the scores of starting a sequence with each
//! label. Ties go to the smaller label index.

use std::str::FromStr;

use bincode::{Decode, Encode};

/// Decoding strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Decode, Encode)]
pub enum DecodeMode {
    /// Left-to-right, best label given the already chosen previous label.
    Greedy,

    /// Globally best label sequence (Viterbi).
    #[default]
    Optimal,
}

impl FromStr for DecodeMode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greedy" => Ok(Self::Greedy),
            "optimal" => Ok(Self::Optimal),
            _ => Err("Could not parse a decode mode"),
        }
    }
}

/// Decodes the best label index at every position.
pub fn decode(mode: DecodeMode, emissions: &[Vec<f64>], transitions: &[Vec<f64>]) -> Vec<usize> {
    match mode {
        DecodeMode::Greedy => decode_greedy(emissions, transitions),
        DecodeMode::Optimal => decode_viterbi(emissions, transitions),
    }
}

fn argmax<I>(scores: I) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = f64>,
{
    let mut best: Option<(usize, f64)> = None;
    for (i, score) in scores.into_iter().enumerate() {
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((i, score)),
        }
    }
    best
}

fn decode_greedy(emissions: &[Vec<f64>], transitions: &[Vec<f64>]) -> Vec<usize> {
    let Some(start) = transitions.len().checked_sub(1) else {
        return vec![];
    };
    let mut path: Vec<usize> = Vec::with_capacity(emissions.len());
    for scores in emissions {
        let prev = path.last().copied().unwrap_or(start);
        let row = &transitions[prev];
        match argmax(scores.iter().zip(row).map(|(e, t)| e + t)) {
            Some((label, _)) => path.push(label),
            None => return vec![],
        }
    }
    path
}

fn decode_viterbi(emissions: &[Vec<f64>], transitions: &[Vec<f64>]) -> Vec<usize> {
    let n_positions = emissions.len();
    let Some(start) = transitions.len().checked_sub(1) else {
        return vec![];
    };
    let n_labels = start;
    if n_positions == 0 || n_labels == 0 {
        return vec![];
    }

    let mut scores: Vec<f64> = emissions[0]
        .iter()
        .zip(&transitions[start])
        .map(|(e, t)| e + t)
        .collect();
    let mut backptr = vec![vec![0; n_labels]; n_positions];
    for pos in 1..n_positions {
        let mut next = vec![f64::NEG_INFINITY; n_labels];
        for (label, score) in next.iter_mut().enumerate() {
            let best = argmax((0..n_labels).map(|prev| scores[prev] + transitions[prev][label]));
            if let Some((prev, s)) = best {
                *score = s + emissions[pos][label];
                backptr[pos][label] = prev;
            }
        }
        scores = next;
    }

    let mut label = argmax(scores.iter().copied()).map_or(0, |(i, _)| i);
    let mut path = vec![0; n_positions];
    path[n_positions - 1] = label;
    for pos in (1..n_positions).rev() {
        label = backptr[pos][label];
        path[pos - 1] = label;
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    // Two labels. The second position strongly prefers staying in the same label, which makes
    // the locally best first choice wrong.
    fn trap() -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let emissions = vec![vec![1.0, 0.9], vec![0.0, 0.0], vec![0.0, 3.0]];
        let transitions = vec![
            vec![0.0, -5.0],  // from 0
            vec![-5.0, 0.0],  // from 1
            vec![0.0, 0.0],   // start
        ];
        (emissions, transitions)
    }

    #[test]
    fn test_decode_greedy() {
        let (emissions, transitions) = trap();

        assert_eq!(
            vec![0, 0, 0],
            decode(DecodeMode::Greedy, &emissions, &transitions)
        );
    }

    #[test]
    fn test_decode_viterbi() {
        let (emissions, transitions) = trap();

        assert_eq!(
            vec![1, 1, 1],
            decode(DecodeMode::Optimal, &emissions, &transitions)
        );
    }

    #[test]
    fn test_decode_ties_go_to_first_label() {
        let emissions = vec![vec![0.0, 0.0, 0.0]; 4];
        let transitions = vec![vec![0.0; 3]; 4];

        assert_eq!(
            vec![0, 0, 0, 0],
            decode(DecodeMode::Greedy, &emissions, &transitions)
        );
        assert_eq!(
            vec![0, 0, 0, 0],
            decode(DecodeMode::Optimal, &emissions, &transitions)
        );
    }

    #[test]
    fn test_decode_empty() {
        let transitions = vec![vec![0.0; 2]; 3];

        assert!(decode(DecodeMode::Optimal, &[], &transitions).is_empty());
        assert!(decode(DecodeMode::Greedy, &[], &transitions).is_empty());
    }

    #[test]
    fn test_decode_mode_from_str() {
        assert_eq!(Ok(DecodeMode::Greedy), "greedy".parse());
        assert_eq!(Ok(DecodeMode::Optimal), "optimal".parse());
        assert!("beam".parse::<DecodeMode>().is_err());
    }
}
