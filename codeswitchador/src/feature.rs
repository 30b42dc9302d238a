//! Context features of a token within a sequence.

use std::io::BufRead;

use crate::corpus::Sequence;
use crate::errors::{CodeswitchError, Result};

/// Extracts features describing the context of one position.
pub trait FeatureGenerator: Send + Sync {
    /// Appends features of `seq[index]` to `features`.
    ///
    /// Appending nothing is valid.
    fn add_features(&self, seq: &Sequence, index: usize, features: &mut Vec<String>);
}

/// The lowercase token at a fixed offset from the current position.
pub struct TokenContextFeature {
    rel_position: isize,
}

impl TokenContextFeature {
    pub const fn new(rel_position: isize) -> Self {
        Self { rel_position }
    }
}

impl FeatureGenerator for TokenContextFeature {
    fn add_features(&self, seq: &Sequence, index: usize, features: &mut Vec<String>) {
        let target = index
            .checked_add_signed(self.rel_position)
            .and_then(|i| seq.get(i));
        if let Some(record) = target {
            features.push(format!("TOK{}:{}", self.rel_position, record.token.lower()));
        }
    }
}

/// Character n-grams of the current token, with `^` and `$` marking its edges.
pub struct CharNgramFeature {
    max_ngram_size: usize,
}

impl CharNgramFeature {
    pub const fn new(max_ngram_size: usize) -> Self {
        Self { max_ngram_size }
    }
}

impl FeatureGenerator for CharNgramFeature {
    fn add_features(&self, seq: &Sequence, index: usize, features: &mut Vec<String>) {
        let Some(record) = seq.get(index) else {
            return;
        };
        let mut chars = vec!['^'];
        chars.extend(record.token.lower().chars());
        chars.push('$');
        for n in 1..=self.max_ngram_size {
            for window in chars.windows(n) {
                if n == 1 && (window[0] == '^' || window[0] == '$') {
                    continue;
                }
                let ngram: String = window.iter().collect();
                features.push(format!("CNG:{ngram}"));
            }
        }
    }
}

/// Character type.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
#[repr(u8)]
pub enum CharacterType {
    /// Digit character. (e.g. 0, 1, 2, ...)
    Digit = b'D',

    /// Uppercase letter. (e.g. A, Ñ, ...)
    Upper = b'U',

    /// Other letter. (e.g. a, ñ, ...)
    Roman = b'R',

    /// Anything else. (e.g. #, @, :, ...)
    Other = b'O',
}

impl CharacterType {
    pub fn get_type(c: char) -> Self {
        if c.is_numeric() {
            Self::Digit
        } else if c.is_uppercase() {
            Self::Upper
        } else if c.is_alphabetic() {
            Self::Roman
        } else {
            Self::Other
        }
    }
}

/// The run-collapsed character type pattern of the current token.
pub struct CharTypeFeature;

impl FeatureGenerator for CharTypeFeature {
    fn add_features(&self, seq: &Sequence, index: usize, features: &mut Vec<String>) {
        let Some(record) = seq.get(index) else {
            return;
        };
        let mut pattern = String::new();
        let mut prev = None;
        for c in record.token.surface().chars() {
            let t = CharacterType::get_type(c);
            if prev != Some(t) {
                pattern.push(char::from(t as u8));
                prev = Some(t);
            }
        }
        features.push(format!("CT:{pattern}"));
    }
}

const ENGLISH_TOP32: &[&str] = &[
    "the", "to", "i", "in", "of", "and", "you", "for", "is", "on", "your", "it", "my", "with",
    "this", "at", "are", "that", "be", "just", "have", "new", "from", "not", "we", "will", "out",
    "what", "by", "can", "all", "how",
];

const SPANISH_TOP32: &[&str] = &[
    "de", "la", "que", "el", "en", "y", "no", "es", "los", "un", "se", "por", "me", "para",
    "con", "lo", "te", "del", "las", "q", "una", "mi", "si", "al", "como", "ya", "tu", "pero",
    "esta", "su", "yo", "le",
];

/// Membership of the current token in short high-frequency word lists.
pub struct WordListFeature {
    lists: Vec<(&'static str, &'static [&'static str])>,
}

impl WordListFeature {
    pub fn new() -> Self {
        Self {
            lists: vec![("en", ENGLISH_TOP32), ("es", SPANISH_TOP32)],
        }
    }
}

impl Default for WordListFeature {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureGenerator for WordListFeature {
    fn add_features(&self, seq: &Sequence, index: usize, features: &mut Vec<String>) {
        let Some(record) = seq.get(index) else {
            return;
        };
        for (lang, words) in &self.lists {
            if words.contains(&record.token.lower()) {
                features.push(format!("WL:{lang}"));
            }
        }
    }
}

type Constructor = fn() -> Box<dyn FeatureGenerator>;

fn char_ngrams() -> Box<dyn FeatureGenerator> {
    Box::new(CharNgramFeature::new(3))
}

fn char_types() -> Box<dyn FeatureGenerator> {
    Box::new(CharTypeFeature)
}

fn wordlist() -> Box<dyn FeatureGenerator> {
    Box::new(WordListFeature::new())
}

const REGISTRY: &[(&str, Constructor)] = &[
    ("char-ngrams", char_ngrams),
    ("char-types", char_types),
    ("wordlist", wordlist),
];

fn resolve(name: &str) -> Option<Box<dyn FeatureGenerator>> {
    if let Some((_, constructor)) = REGISTRY.iter().find(|(n, _)| *n == name) {
        return Some(constructor());
    }
    let offset = name.strip_prefix("token")?;
    let rel_position = match offset.as_bytes().first() {
        None => 0,
        Some(b'+') => offset[1..].parse::<isize>().ok()?,
        Some(b'-') => offset.parse::<isize>().ok()?,
        Some(_) => return None,
    };
    Some(Box::new(TokenContextFeature::new(rel_position)))
}

/// An ordered composition of feature generators.
pub struct FeatureSet {
    names: Vec<String>,
    generators: Vec<Box<dyn FeatureGenerator>>,
}

impl FeatureSet {
    /// Resolves generator names.
    ///
    /// Accepted names are `token`, `token+K`, `token-K`, `char-ngrams`, `char-types` and
    /// `wordlist`.
    ///
    /// # Errors
    ///
    /// [`CodeswitchError::InvalidArgument`] is returned for an unknown name.
    ///
    /// # Examples
    ///
    /// ```
    /// use codeswitchador::FeatureSet;
    ///
    /// assert!(FeatureSet::from_names(["token-1", "token", "token+1"]).is_ok());
    /// assert!(FeatureSet::from_names(["tokens"]).is_err());
    /// ```
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut resolved = vec![];
        let mut generators = vec![];
        for name in names {
            let name = name.as_ref();
            let generator = resolve(name).ok_or_else(|| {
                CodeswitchError::invalid_argument(
                    "features",
                    format!("unknown feature generator `{name}`"),
                )
            })?;
            resolved.push(name.to_string());
            generators.push(generator);
        }
        Ok(Self {
            names: resolved,
            generators,
        })
    }

    /// Reads generator names from a configuration with one name per line.
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn read_config<R>(rdr: R) -> Result<Self>
    where
        R: BufRead,
    {
        let mut names = vec![];
        for line in rdr.lines() {
            let line = line?;
            let name = line.trim();
            if name.is_empty() || name.starts_with('#') {
                continue;
            }
            names.push(name.to_string());
        }
        Self::from_names(names)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Extracts the features of every position of `seq`.
    pub fn extract(&self, seq: &Sequence) -> Vec<Vec<String>> {
        (0..seq.len())
            .map(|i| {
                let mut features = vec![];
                for generator in &self.generators {
                    generator.add_features(seq, i, &mut features);
                }
                features
            })
            .collect()
    }
}
