use crate::error::ModelLoadError;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Tokens of two or more word characters, the usual count-vectorizer default.
pub const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

lazy_static! {
    static ref DEFAULT_RE: Regex = Regex::new(DEFAULT_TOKEN_PATTERN).expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Accent folding applied before tokenization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StripAccents {
    /// NFKD, then drop combining marks.
    Unicode,
    /// NFKD, then drop every non-ASCII character.
    Ascii,
}

/// Tokenization policy the vocabulary was built with. Stored alongside the
/// model artifacts; a mismatch here makes every score meaningless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    pub lowercase: bool,
    /// Regex whose matches are tokens. With exactly one capture group the
    /// group is the token.
    pub token_pattern: String,
    pub strip_accents: Option<StripAccents>,
    /// Drop English stop words before building n-grams. The list is this
    /// crate's own, contractions included; it is not any vectorizer's
    /// built-in list, so a model built with a different list should ship
    /// with this off and its stop words already absent from the vocabulary.
    pub stop_words: bool,
    /// English Snowball stemming per token.
    pub stem: bool,
    /// Inclusive word n-gram range.
    pub ngram_range: (usize, usize),
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            token_pattern: DEFAULT_TOKEN_PATTERN.to_string(),
            strip_accents: None,
            stop_words: false,
            stem: false,
            ngram_range: (1, 1),
        }
    }
}

/// Compiled tokenizer. Cheap to clone; holds no mutable state.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    config: TokenizerConfig,
    pattern: Regex,
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Result<Self, ModelLoadError> {
        let (min_n, max_n) = config.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(ModelLoadError::InvalidTokenizer(format!(
                "ngram_range ({min_n}, {max_n}) must satisfy 1 <= min <= max"
            )));
        }
        let pattern = if config.token_pattern == DEFAULT_TOKEN_PATTERN {
            DEFAULT_RE.clone()
        } else {
            Regex::new(&config.token_pattern).map_err(|e| ModelLoadError::InvalidTokenizer(e.to_string()))?
        };
        // group 0 is the whole match
        if pattern.captures_len() > 2 {
            return Err(ModelLoadError::InvalidTokenizer(
                "token_pattern may contain at most one capture group".into(),
            ));
        }
        Ok(Self { config, pattern })
    }

    pub fn config(&self) -> &TokenizerConfig { &self.config }

    /// Split `text` into vocabulary terms: accent folding, case folding,
    /// pattern matching, stop-word removal, stemming, then n-grams.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = self.preprocess(text);
        let mut words: Vec<String> = if self.pattern.captures_len() == 2 {
            self.pattern
                .captures_iter(&normalized)
                .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
                .collect()
        } else {
            self.pattern.find_iter(&normalized).map(|m| m.as_str().to_string()).collect()
        };
        if self.config.stop_words {
            words.retain(|w| !is_stopword(w));
        }
        if self.config.stem {
            for w in words.iter_mut() {
                *w = STEMMER.stem(w).into_owned();
            }
        }
        self.ngrams(words)
    }

    fn preprocess(&self, text: &str) -> String {
        let folded: String = match self.config.strip_accents {
            Some(StripAccents::Unicode) => text.nfkd().filter(|c| !is_combining_mark(*c)).collect(),
            Some(StripAccents::Ascii) => text.nfkd().filter(|c| c.is_ascii()).collect(),
            None => text.to_string(),
        };
        if self.config.lowercase { folded.to_lowercase() } else { folded }
    }

    fn ngrams(&self, words: Vec<String>) -> Vec<String> {
        let (min_n, max_n) = self.config.ngram_range;
        if max_n == 1 {
            return words;
        }
        let max_n = max_n.min(words.len());
        let mut out = Vec::new();
        for n in min_n..=max_n {
            for window in words.windows(n) {
                out.push(window.join(" "));
            }
        }
        out
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self { config: TokenizerConfig::default(), pattern: DEFAULT_RE.clone() }
    }
}
