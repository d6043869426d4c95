//! Error taxonomy for model loading, ranking, text extraction and export.

use std::{io, path::PathBuf, string::FromUtf8Error};

use thiserror::Error;

/// Failure to load or validate a Term-Weight Model. Fatal at startup.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    /// An artifact file is missing or unreadable.
    #[error("failed to read model artifact {path}: {source}")]
    Io {
        /// Artifact path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// An artifact could not be decoded.
    #[error("corrupt model artifact {path}: {message}")]
    Decode {
        /// Artifact path.
        path: PathBuf,
        /// Decoder message.
        message: String,
    },

    /// Vocabulary and IDF weights disagree in cardinality.
    #[error("vocabulary has {vocabulary} terms but idf has {idf} weights")]
    LengthMismatch {
        /// Number of vocabulary terms.
        vocabulary: usize,
        /// Number of idf weights.
        idf: usize,
    },

    /// A feature index is out of range or assigned to more than one term.
    #[error("invalid feature index {index} for term {term:?}")]
    InvalidIndex {
        /// Offending term.
        term: String,
        /// Offending index.
        index: u32,
    },

    /// An idf weight is negative or not finite.
    #[error("invalid idf weight {weight} at index {index}")]
    InvalidWeight {
        /// Feature index.
        index: usize,
        /// Offending weight.
        weight: f64,
    },

    /// The stored tokenizer configuration cannot be used.
    #[error("invalid tokenizer configuration: {0}")]
    InvalidTokenizer(String),

    /// The metadata file disagrees with the artifacts it describes.
    #[error("model metadata mismatch: {0}")]
    Meta(String),
}

/// Recoverable per-call ranking failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RankError {
    /// Input text is empty or whitespace only.
    #[error("input text is empty")]
    EmptyInput,

    /// No input token matched the vocabulary.
    #[error("no keywords found: no input term is in the model vocabulary")]
    EmptyResult,

    /// Requested result count is not at least one.
    #[error("top_n must be at least 1, got {0}")]
    InvalidTopN(usize),
}

impl RankError {
    /// Short machine-readable tag.
    pub fn kind(&self) -> &'static str {
        match self {
            RankError::EmptyInput => "empty_input",
            RankError::EmptyResult => "empty_result",
            RankError::InvalidTopN(_) => "invalid_top_n",
        }
    }
}

/// Failure of a text source to produce a string.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The source file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Source path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The PDF reader rejected the document.
    #[error("failed to extract text from PDF: {0}")]
    Pdf(#[source] pdf_extract::OutputError),

    /// The PDF reader panicked, usually on a malformed document.
    #[error("PDF extraction panicked (malformed or unsupported document)")]
    Panicked,

    /// A plain text file was not valid UTF-8.
    #[error("{path} is not valid UTF-8 text: {source}")]
    NotUtf8 {
        /// Source path.
        path: PathBuf,
        /// Decoder error.
        source: FromUtf8Error,
    },
}

/// Failure to serialize ranked keywords.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV writer failure.
    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),

    /// Flushing the underlying writer failed.
    #[error("csv export failed: {0}")]
    Io(#[from] io::Error),

    /// Output was not UTF-8.
    #[error("csv output is not UTF-8")]
    Utf8,
}
