use hashbrown::HashMap;

use crate::corpus::Sequence;
use crate::decode::{self, DecodeMode};
use crate::errors::{CodeswitchError, Result};
use crate::feature::FeatureSet;
use crate::model::Model;

/// Tagger.
///
/// Assigns labels to sequences with the weights of a [`Model`].
pub struct Tagger {
    feature_set: FeatureSet,
    feature_ids: HashMap<String, usize>,
    labels: Vec<String>,
    weights: Vec<Vec<f64>>,
    transitions: Vec<Vec<f64>>,
    decode_mode: DecodeMode,
}

impl Tagger {
    /// Creates a new tagger.
    ///
    /// # Errors
    ///
    /// [`CodeswitchError::InvalidModel`] is returned when the model has no labels or its weight
    /// tables do not match its labels and features. An unknown feature generator name is reported
    /// as [`CodeswitchError::InvalidArgument`].
    pub fn new(model: Model) -> Result<Self> {
        let n_labels = model.labels.len();
        if n_labels == 0 {
            return Err(CodeswitchError::invalid_model("the model has no labels"));
        }
        if model.weights.len() != model.features.len() {
            return Err(CodeswitchError::invalid_model(format!(
                "{} weight rows for {} features",
                model.weights.len(),
                model.features.len()
            )));
        }
        if model.transitions.len() != n_labels + 1 {
            return Err(CodeswitchError::invalid_model(format!(
                "{} transition rows for {} labels",
                model.transitions.len(),
                n_labels
            )));
        }
        if model
            .weights
            .iter()
            .chain(&model.transitions)
            .any(|row| row.len() != n_labels)
        {
            return Err(CodeswitchError::invalid_model(
                "weight row width does not match the number of labels",
            ));
        }
        let feature_set = FeatureSet::from_names(&model.feature_names)?;
        let feature_ids = model
            .features
            .into_iter()
            .enumerate()
            .map(|(i, f)| (f, i))
            .collect();
        Ok(Self {
            feature_set,
            feature_ids,
            labels: model.labels,
            weights: model.weights,
            transitions: model.transitions,
            decode_mode: model.decode_mode,
        })
    }

    /// Overrides the decoding strategy stored in the model.
    pub fn decode_mode(mut self, decode_mode: DecodeMode) -> Self {
        self.decode_mode = decode_mode;
        self
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    fn emission_scores(&self, seq: &Sequence) -> Vec<Vec<f64>> {
        self.feature_set
            .extract(seq)
            .iter()
            .map(|features| {
                let mut scores = vec![0.0; self.labels.len()];
                for id in features.iter().filter_map(|f| self.feature_ids.get(f)) {
                    for (s, w) in scores.iter_mut().zip(&self.weights[*id]) {
                        *s += w;
                    }
                }
                scores
            })
            .collect()
    }

    /// Labels every record of `seq`.
    pub fn tag(&self, seq: &Sequence) -> Vec<&str> {
        let emissions = self.emission_scores(seq);
        decode::decode(self.decode_mode, &emissions, &self.transitions)
            .into_iter()
            .map(|label| self.labels[label].as_str())
            .collect()
    }

    /// Returns a copy of `seq` carrying the predicted tags.
    pub fn predict(&self, seq: &Sequence) -> Sequence {
        seq.with_tags(&self.tag(seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::TokenTag;

    fn model() -> Model {
        Model {
            labels: vec!["e".to_string(), "s".to_string()],
            features: vec!["TOK0:the".to_string(), "TOK0:gato".to_string()],
            weights: vec![vec![2.0, -2.0], vec![-2.0, 2.0]],
            transitions: vec![vec![0.0, 0.0], vec![0.0, 0.0], vec![0.0, 0.0]],
            feature_names: vec!["token".to_string()],
            decode_mode: DecodeMode::Optimal,
        }
    }

    #[test]
    fn test_tagger_tag() {
        let tagger = Tagger::new(model()).unwrap();
        let seq = Sequence::new(vec![
            TokenTag::new("The", "?"),
            TokenTag::new("gato", "?"),
            TokenTag::new("unseen", "?").with_comment("x"),
        ]);

        assert_eq!(vec!["e", "s", "e"], tagger.tag(&seq));

        let predicted = tagger.predict(&seq);
        assert_eq!("s", predicted.records()[1].tag);
        assert_eq!(Some("x"), predicted.records()[2].comment.as_deref());
    }

    #[test]
    fn test_tagger_greedy_override() {
        let tagger = Tagger::new(model())
            .unwrap()
            .decode_mode(DecodeMode::Greedy);
        let seq = Sequence::new(vec![TokenTag::new("gato", "?")]);

        assert_eq!(vec!["s"], tagger.tag(&seq));
    }

    #[test]
    fn test_tagger_invalid_model() {
        let mut m = model();
        m.transitions.pop();
        let result = Tagger::new(m);

        assert!(result.is_err());
        assert_eq!(
            "InvalidModelError: 2 transition rows for 2 labels",
            result.err().unwrap().to_string()
        );

        let mut m = model();
        m.labels.clear();
        assert!(Tagger::new(m).is_err());
    }
}
