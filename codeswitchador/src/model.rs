use std::io::{Read, Write};

use bincode::{Decode, Encode};

use crate::decode::DecodeMode;
use crate::errors::Result;

/// Model data.
///
/// Weights of a trained perceptron, frozen for tagging.
#[derive(Debug, Clone, PartialEq, Decode, Encode)]
pub struct Model {
    pub(crate) labels: Vec<String>,
    pub(crate) features: Vec<String>,

    /// `weights[feature][label]`
    pub(crate) weights: Vec<Vec<f64>>,

    /// `transitions[prev][label]`; the last row scores the sequence start.
    pub(crate) transitions: Vec<Vec<f64>>,

    pub(crate) feature_names: Vec<String>,
    pub(crate) decode_mode: DecodeMode,
}

impl Model {
    /// Exports the model data.
    ///
    /// # Arguments
    ///
    /// * `wtr` - Byte-oriented sink object.
    ///
    /// # Errors
    ///
    /// When `wtr` generates an error, it will be returned as is.
    pub fn write<W>(&self, wtr: &mut W) -> Result<()>
    where
        W: Write,
    {
        bincode::encode_into_std_write(self, wtr, bincode::config::standard())?;
        Ok(())
    }

    /// Creates a model from a reader.
    ///
    /// # Arguments
    ///
    /// * `rdr` - A data source.
    ///
    /// # Returns
    ///
    /// A model data read from `rdr`.
    ///
    /// # Errors
    ///
    /// When `rdr` generates an error, it will be returned as is.
    pub fn read<R>(rdr: &mut R) -> Result<Self>
    where
        R: Read,
    {
        Ok(bincode::decode_from_std_read(
            rdr,
            bincode::config::standard(),
        )?)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    /// Names of the feature generators the model was trained with.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn decode_mode(&self) -> DecodeMode {
        self.decode_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_write_read() {
        let model = Model {
            labels: vec!["e".to_string(), "s".to_string()],
            features: vec!["TOK0:hola".to_string()],
            weights: vec![vec![-1.5, 2.0]],
            transitions: vec![vec![0.5, -0.5], vec![0.0, 1.0], vec![0.25, 0.0]],
            feature_names: vec!["token".to_string()],
            decode_mode: DecodeMode::Greedy,
        };
        let mut buf = vec![];
        model.write(&mut buf).unwrap();
        let restored = Model::read(&mut buf.as_slice()).unwrap();

        assert_eq!(model, restored);
    }
}
