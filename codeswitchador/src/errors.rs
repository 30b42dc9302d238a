//! Definition of errors.

use std::error::Error;
use std::fmt;

pub type Result<T, E = CodeswitchError> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum CodeswitchError {
    InvalidArgument(InvalidArgumentError),
    InvalidCorpus(InvalidCorpusError),
    Integrity(IntegrityError),
    InvalidModel(InvalidModelError),
    DecodeError(bincode::error::DecodeError),
    EncodeError(bincode::error::EncodeError),
    IOError(std::io::Error),
}

impl CodeswitchError {
    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError {
            arg,
            msg: msg.into(),
        })
    }

    pub(crate) fn invalid_corpus<S>(line: usize, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidCorpus(InvalidCorpusError {
            line,
            msg: msg.into(),
        })
    }

    pub(crate) fn integrity<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::Integrity(IntegrityError { msg: msg.into() })
    }

    pub(crate) fn invalid_model<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidModel(InvalidModelError { msg: msg.into() })
    }
}

impl fmt::Display for CodeswitchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidArgument(e) => e.fmt(f),
            Self::InvalidCorpus(e) => e.fmt(f),
            Self::Integrity(e) => e.fmt(f),
            Self::InvalidModel(e) => e.fmt(f),
            Self::DecodeError(e) => e.fmt(f),
            Self::EncodeError(e) => e.fmt(f),
            Self::IOError(e) => e.fmt(f),
        }
    }
}

impl Error for CodeswitchError {}

/// Error used when the argument is invalid.
#[derive(Debug)]
pub struct InvalidArgumentError {
    /// Name of the argument.
    pub(crate) arg: &'static str,

    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidArgumentError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidArgumentError {}

/// Error used when a corpus cannot be parsed.
#[derive(Debug)]
pub struct InvalidCorpusError {
    /// 1-based line number.
    pub(crate) line: usize,

    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidCorpusError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidCorpusError: line {}: {}", self.line, self.msg)
    }
}

impl Error for InvalidCorpusError {}

/// Error used when estimated probabilities do not sum to one.
#[derive(Debug)]
pub struct IntegrityError {
    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "IntegrityError: {}", self.msg)
    }
}

impl Error for IntegrityError {}

/// Error used when the model is invalid.
#[derive(Debug)]
pub struct InvalidModelError {
    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidModelError: {}", self.msg)
    }
}

impl Error for InvalidModelError {}

impl From<bincode::error::DecodeError> for CodeswitchError {
    fn from(error: bincode::error::DecodeError) -> Self {
        Self::DecodeError(error)
    }
}

impl From<bincode::error::EncodeError> for CodeswitchError {
    fn from(error: bincode::error::EncodeError) -> Self {
        Self::EncodeError(error)
    }
}

impl From<std::io::Error> for CodeswitchError {
    fn from(error: std::io::Error) -> Self {
        Self::IOError(error)
    }
}
