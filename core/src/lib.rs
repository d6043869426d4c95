//! Keyword extraction with a pretrained TF-IDF model.
//!
//! A [`TermWeightModel`] is loaded once (see [`persist::load_model`]) and
//! shared read-only; [`rank`] turns text into the top-N terms with
//! confidences that sum to 100.

pub mod error;
pub mod export;
pub mod model;
pub mod persist;
pub mod rank;
pub mod source;
pub mod tokenizer;

pub use error::{ExportError, ExtractionError, ModelLoadError, RankError};
pub use model::{Norm, TermFrequencies, TermId, TermWeightModel, WeightedVector, WeightingConfig};
pub use rank::{extract_keywords, rank, RankedKeyword, DEFAULT_TOP_N};
pub use tokenizer::{StripAccents, TokenizerConfig};
