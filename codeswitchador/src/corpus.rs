use std::io::{BufRead, Write};

use hashbrown::HashSet;

use crate::errors::{CodeswitchError, Result};

/// A text unit with its lowercase form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    surface: String,
    lower: String,
}

impl Token {
    /// Creates a new token.
    ///
    /// # Examples
    ///
    /// ```
    /// use codeswitchador::Token;
    ///
    /// let t = Token::new("Hola");
    /// assert_eq!("Hola", t.surface());
    /// assert_eq!("hola", t.lower());
    /// ```
    pub fn new<S>(surface: S) -> Self
    where
        S: Into<String>,
    {
        let surface = surface.into();
        let lower = surface.to_lowercase();
        Self { surface, lower }
    }

    /// Gets the case-sensitive form.
    pub fn surface(&self) -> &str {
        &self.surface
    }

    /// Gets the lowercase form used for feature and vocabulary keys.
    pub fn lower(&self) -> &str {
        &self.lower
    }
}

/// A token with its tag and an optional comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTag {
    pub token: Token,
    pub tag: String,
    pub comment: Option<String>,
}

/// The estimator reads the tag of a record as its state.
pub type TokenState = TokenTag;

impl TokenTag {
    pub fn new<S, T>(token: S, tag: T) -> Self
    where
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            token: Token::new(token),
            tag: tag.into(),
            comment: None,
        }
    }

    pub fn with_comment<C>(mut self, comment: C) -> Self
    where
        C: Into<String>,
    {
        self.comment = Some(comment.into());
        self
    }

    /// Alias of the tag for state-oriented code.
    pub fn state(&self) -> &str {
        &self.tag
    }
}

/// One utterance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sequence {
    records: Vec<TokenTag>,
}

impl Sequence {
    pub fn new(records: Vec<TokenTag>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TokenTag> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[TokenTag] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TokenTag> {
        self.records.iter()
    }

    /// Returns a copy of this sequence carrying the given tags.
    ///
    /// Comments are kept. `tags` must have one entry per record.
    pub fn with_tags<S>(&self, tags: &[S]) -> Self
    where
        S: AsRef<str>,
    {
        debug_assert_eq!(self.records.len(), tags.len());
        Self {
            records: self
                .records
                .iter()
                .zip(tags)
                .map(|(r, t)| TokenTag {
                    token: r.token.clone(),
                    tag: t.as_ref().to_string(),
                    comment: r.comment.clone(),
                })
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a TokenTag;
    type IntoIter = std::slice::Iter<'a, TokenTag>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// A record whose tag is outside the allowed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagViolation {
    /// 1-based sequence number.
    pub sequence: usize,

    /// 1-based position within the sequence.
    pub position: usize,

    pub tag: String,
}

/// An ordered, re-iterable list of sequences.
///
/// The text format has one record per line, `token<TAB>tag[<TAB>comment]`, and a blank line
/// after each sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Corpus {
    sequences: Vec<Sequence>,
}

impl Corpus {
    pub fn new(sequences: Vec<Sequence>) -> Self {
        Self { sequences }
    }

    /// Reads a corpus.
    ///
    /// # Errors
    ///
    /// [`CodeswitchError::InvalidCorpus`] is returned for a line that does not have two or three
    /// columns, or that has an empty token or tag.
    ///
    /// # Examples
    ///
    /// ```
    /// use codeswitchador::Corpus;
    ///
    /// let text = "I\te\nquiero\ts\n\n:)\tn\temoticon\n";
    /// let corpus = Corpus::read(text.as_bytes()).unwrap();
    /// assert_eq!(2, corpus.len());
    /// assert_eq!(Some("emoticon"), corpus.sequences()[1].records()[0].comment.as_deref());
    /// ```
    pub fn read<R>(rdr: R) -> Result<Self>
    where
        R: BufRead,
    {
        let mut sequences = vec![];
        let mut records = vec![];
        for (i, line) in rdr.lines().enumerate() {
            let line = line?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                if !records.is_empty() {
                    sequences.push(Sequence::new(std::mem::take(&mut records)));
                }
                continue;
            }
            records.push(Self::parse_record(line, i + 1)?);
        }
        if !records.is_empty() {
            sequences.push(Sequence::new(records));
        }
        Ok(Self { sequences })
    }

    fn parse_record(line: &str, line_no: usize) -> Result<TokenTag> {
        let cols: Vec<&str> = line.split('\t').collect();
        let (token, tag, comment) = match cols[..] {
            [token, tag] => (token, tag, None),
            [token, tag, comment] => (token, tag, Some(comment)),
            _ => {
                return Err(CodeswitchError::invalid_corpus(
                    line_no,
                    format!("expected 2 or 3 tab-separated columns, got {}", cols.len()),
                ))
            }
        };
        if token.is_empty() {
            return Err(CodeswitchError::invalid_corpus(line_no, "empty token"));
        }
        if tag.is_empty() {
            return Err(CodeswitchError::invalid_corpus(line_no, "empty tag"));
        }
        let record = TokenTag::new(token, tag);
        Ok(match comment {
            Some(c) if !c.is_empty() => record.with_comment(c),
            _ => record,
        })
    }

    /// Writes the corpus in the format accepted by [`Corpus::read`].
    pub fn write<W>(&self, wtr: &mut W) -> Result<()>
    where
        W: Write,
    {
        for seq in &self.sequences {
            write_sequence(wtr, seq)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sequence> {
        self.sequences.iter()
    }

    /// Lists every record whose tag is not in `allowed`.
    pub fn invalid_tags<S>(&self, allowed: &[S]) -> Vec<TagViolation>
    where
        S: AsRef<str>,
    {
        let allowed: HashSet<&str> = allowed.iter().map(AsRef::as_ref).collect();
        let mut violations = vec![];
        for (i, seq) in self.sequences.iter().enumerate() {
            for (j, record) in seq.iter().enumerate() {
                if !allowed.contains(record.tag.as_str()) {
                    violations.push(TagViolation {
                        sequence: i + 1,
                        position: j + 1,
                        tag: record.tag.clone(),
                    });
                }
            }
        }
        violations
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a Sequence;
    type IntoIter = std::slice::Iter<'a, Sequence>;

    fn into_iter(self) -> Self::IntoIter {
        self.sequences.iter()
    }
}

/// Writes one sequence followed by its terminating blank line.
pub fn write_sequence<W>(wtr: &mut W, seq: &Sequence) -> Result<()>
where
    W: Write,
{
    for record in seq {
        match &record.comment {
            Some(comment) => writeln!(
                wtr,
                "{}\t{}\t{}",
                record.token.surface(),
                record.tag,
                comment
            )?,
            None => writeln!(wtr, "{}\t{}", record.token.surface(), record.tag)?,
        }
    }
    writeln!(wtr)?;
    Ok(())
}
