//! Top-N keyword ranking over a [`TermWeightModel`].

use crate::error::RankError;
use crate::model::{TermId, TermWeightModel};
use serde::{Deserialize, Serialize};

/// Default result count for callers that do not pick one.
pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedKeyword {
    pub term: String,
    /// Share of the retained weight, in percent, rounded to 2 decimals.
    pub confidence: f64,
    /// Raw TF-IDF weight the ordering is based on.
    pub weight: f64,
}

/// Rank the terms of `text` by TF-IDF weight and keep the best `top_n`.
///
/// Confidences are each keyword's share of the total retained weight, so
/// they sum to 100 up to rounding (at most 0.005 per keyword). Equal weights
/// keep ascending feature-index order.
pub fn rank(text: &str, top_n: usize, model: &TermWeightModel) -> Result<Vec<RankedKeyword>, RankError> {
    if top_n == 0 {
        return Err(RankError::InvalidTopN(top_n));
    }
    if text.trim().is_empty() {
        return Err(RankError::EmptyInput);
    }

    let tf = model.vectorize(text);
    let weighted = model.weigh(&tf);

    // BTreeMap iteration is index-ordered; the stable sort keeps that for ties.
    let mut scored: Vec<(TermId, f64)> = weighted.into_iter().filter(|(_, w)| *w > 0.0).collect();
    if scored.is_empty() {
        return Err(RankError::EmptyResult);
    }
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(top_n);

    let total: f64 = scored.iter().map(|(_, w)| w).sum();
    let keywords = scored
        .into_iter()
        .filter_map(|(id, weight)| {
            model.term(id).map(|term| RankedKeyword { term: term.to_string(), confidence: round2(weight / total * 100.0), weight })
        })
        .collect::<Vec<_>>();
    tracing::debug!(top_n, matched = tf.len(), returned = keywords.len(), "ranked keywords");
    Ok(keywords)
}

/// Caller-facing entry point for UI, CLI and service wrappers.
pub fn extract_keywords(text: &str, top_n: usize, model: &TermWeightModel) -> Result<Vec<RankedKeyword>, RankError> {
    rank(text, top_n, model)
}

/// Two decimals, rounding the exact binary value with ties to even.
fn round2(x: f64) -> f64 { format!("{x:.2}").parse().unwrap_or(x) }
