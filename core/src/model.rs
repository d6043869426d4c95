//! The Term-Weight Model: a fixed vocabulary plus aligned inverse document
//! frequencies, applied to new text at inference time. Nothing here mutates
//! after construction, so a single instance is shared by all ranking calls.

use crate::error::ModelLoadError;
use crate::tokenizer::{Tokenizer, TokenizerConfig};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub type TermId = u32;

/// Sparse term counts for one input, keyed by feature index.
pub type TermFrequencies = BTreeMap<TermId, u32>;

/// Sparse TF-IDF weights for one input, keyed by feature index.
pub type WeightedVector = BTreeMap<TermId, f64>;

/// Row normalization applied after TF-IDF weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    None,
    L1,
    #[default]
    L2,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightingConfig {
    /// Replace tf with 1 + ln(tf).
    pub sublinear_tf: bool,
    pub use_idf: bool,
    pub norm: Norm,
}

impl Default for WeightingConfig {
    fn default() -> Self {
        Self { sublinear_tf: false, use_idf: true, norm: Norm::L2 }
    }
}

/// Term to feature index, with the inverse mapping built once at load.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    index: HashMap<String, TermId>,
    terms: Vec<String>,
}

impl Vocabulary {
    /// Indices must be unique and cover `0..len` exactly.
    pub fn new(index: HashMap<String, TermId>) -> Result<Self, ModelLoadError> {
        let mut slots: Vec<Option<String>> = vec![None; index.len()];
        for (term, &id) in &index {
            let invalid = || ModelLoadError::InvalidIndex { term: term.clone(), index: id };
            let slot = slots.get_mut(id as usize).ok_or_else(invalid)?;
            if slot.is_some() {
                return Err(invalid());
            }
            *slot = Some(term.clone());
        }
        let terms = slots.into_iter().flatten().collect();
        Ok(Self { index, terms })
    }

    pub fn get(&self, term: &str) -> Option<TermId> { self.index.get(term).copied() }

    pub fn term(&self, id: TermId) -> Option<&str> { self.terms.get(id as usize).map(String::as_str) }

    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    pub fn as_map(&self) -> &HashMap<String, TermId> { &self.index }
}

/// One finite, non-negative weight per feature index.
#[derive(Debug, Clone)]
pub struct IdfWeights(Vec<f64>);

impl IdfWeights {
    pub fn new(weights: Vec<f64>) -> Result<Self, ModelLoadError> {
        if let Some((index, &weight)) = weights.iter().enumerate().find(|(_, w)| !w.is_finite() || **w < 0.0) {
            return Err(ModelLoadError::InvalidWeight { index, weight });
        }
        Ok(Self(weights))
    }

    pub fn get(&self, id: TermId) -> Option<f64> { self.0.get(id as usize).copied() }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    pub fn as_slice(&self) -> &[f64] { &self.0 }
}

#[derive(Debug, Clone)]
pub struct TermWeightModel {
    vocabulary: Vocabulary,
    idf: IdfWeights,
    tokenizer: Tokenizer,
    weighting: WeightingConfig,
}

impl TermWeightModel {
    pub fn new(
        vocabulary: HashMap<String, TermId>,
        idf: Vec<f64>,
        tokenizer: TokenizerConfig,
        weighting: WeightingConfig,
    ) -> Result<Self, ModelLoadError> {
        if vocabulary.len() != idf.len() {
            return Err(ModelLoadError::LengthMismatch { vocabulary: vocabulary.len(), idf: idf.len() });
        }
        Ok(Self {
            vocabulary: Vocabulary::new(vocabulary)?,
            idf: IdfWeights::new(idf)?,
            tokenizer: Tokenizer::new(tokenizer)?,
            weighting,
        })
    }

    /// Model with the default tokenizer and L2-normalized count x idf weighting.
    pub fn with_defaults(vocabulary: HashMap<String, TermId>, idf: Vec<f64>) -> Result<Self, ModelLoadError> {
        Self::new(vocabulary, idf, TokenizerConfig::default(), WeightingConfig::default())
    }

    /// Count occurrences of known terms. Out-of-vocabulary tokens are dropped.
    pub fn vectorize(&self, text: &str) -> TermFrequencies {
        let mut tf = TermFrequencies::new();
        for token in self.tokenizer.tokenize(text) {
            if let Some(id) = self.vocabulary.get(&token) {
                *tf.entry(id).or_insert(0) += 1;
            }
        }
        tf
    }

    /// Apply tf scaling, idf and row normalization.
    pub fn weigh(&self, tf: &TermFrequencies) -> WeightedVector {
        let mut weighted: WeightedVector = tf
            .iter()
            .map(|(&id, &count)| {
                let tf = if self.weighting.sublinear_tf { 1.0 + (count as f64).ln() } else { count as f64 };
                let idf = if self.weighting.use_idf { self.idf.get(id).unwrap_or(0.0) } else { 1.0 };
                (id, tf * idf)
            })
            .collect();
        let norm = match self.weighting.norm {
            Norm::None => 1.0,
            Norm::L1 => weighted.values().map(|w| w.abs()).sum(),
            Norm::L2 => weighted.values().map(|w| w * w).sum::<f64>().sqrt(),
        };
        if norm > 0.0 {
            for w in weighted.values_mut() {
                *w /= norm;
            }
        }
        weighted
    }

    pub fn term(&self, id: TermId) -> Option<&str> { self.vocabulary.term(id) }

    pub fn vocabulary(&self) -> &Vocabulary { &self.vocabulary }

    pub fn idf(&self) -> &IdfWeights { &self.idf }

    pub fn tokenizer_config(&self) -> &TokenizerConfig { self.tokenizer.config() }

    pub fn weighting(&self) -> &WeightingConfig { &self.weighting }

    pub fn len(&self) -> usize { self.vocabulary.len() }

    pub fn is_empty(&self) -> bool { self.vocabulary.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(terms: &[(&str, TermId)]) -> HashMap<String, TermId> {
        terms.iter().map(|(t, i)| (t.to_string(), *i)).collect()
    }

    fn pets() -> TermWeightModel {
        TermWeightModel::with_defaults(vocab(&[("cat", 0), ("dog", 1), ("fish", 2)]), vec![1.0, 2.0, 3.0]).unwrap()
    }

    #[test]
    fn vectorize_counts_known_terms() {
        let tf = pets().vectorize("Cat cat DOG bird");
        assert_eq!(tf, TermFrequencies::from([(0, 2), (1, 1)]));
    }

    #[test]
    fn weigh_multiplies_by_idf() {
        let weighting = WeightingConfig { norm: Norm::None, ..Default::default() };
        let model = TermWeightModel::new(pets().vocabulary().as_map().clone(), vec![1.0, 2.0, 3.0], TokenizerConfig::default(), weighting)
            .unwrap();
        let w = model.weigh(&model.vectorize("cat cat dog fish"));
        assert_eq!(w, WeightedVector::from([(0, 2.0), (1, 2.0), (2, 3.0)]));
    }

    #[test]
    fn default_weights_are_l2_normalized() {
        let model = pets();
        assert_eq!(model.weighting().norm, Norm::L2);
        let w = model.weigh(&model.vectorize("cat cat dog fish"));
        let norm = 17f64.sqrt();
        assert!((w[&0] - 2.0 / norm).abs() < 1e-12);
        assert!((w[&1] - 2.0 / norm).abs() < 1e-12);
        assert!((w[&2] - 3.0 / norm).abs() < 1e-12);
        assert!((w.values().map(|v| v * v).sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn weigh_applies_sublinear_tf_and_l2() {
        let weighting = WeightingConfig { sublinear_tf: true, use_idf: true, norm: Norm::L2 };
        let model = TermWeightModel::new(vocab(&[("a1", 0), ("b2", 1)]), vec![1.0, 1.0], TokenizerConfig::default(), weighting)
            .unwrap();
        let w = model.weigh(&TermFrequencies::from([(0, 1), (1, 1)]));
        let expected = 1.0 / 2f64.sqrt();
        assert!((w[&0] - expected).abs() < 1e-12);
        assert!((w[&1] - expected).abs() < 1e-12);
    }

    #[test]
    fn inverse_mapping() {
        let model = pets();
        assert_eq!(model.term(2), Some("fish"));
        assert_eq!(model.term(3), None);
        assert_eq!(model.len(), 3);
    }

    #[test]
    fn rejects_length_mismatch() {
        let err = TermWeightModel::with_defaults(vocab(&[("cat", 0)]), vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, ModelLoadError::LengthMismatch { vocabulary: 1, idf: 2 }));
    }

    #[test]
    fn rejects_sparse_or_duplicate_indices() {
        let err = TermWeightModel::with_defaults(vocab(&[("cat", 0), ("dog", 5)]), vec![1.0, 1.0]).unwrap_err();
        assert!(matches!(err, ModelLoadError::InvalidIndex { index: 5, .. }));
        let err = TermWeightModel::with_defaults(vocab(&[("cat", 0), ("dog", 0)]), vec![1.0, 1.0]).unwrap_err();
        assert!(matches!(err, ModelLoadError::InvalidIndex { index: 0, .. }));
    }

    #[test]
    fn rejects_invalid_weights() {
        let err = TermWeightModel::with_defaults(vocab(&[("cat", 0)]), vec![f64::NAN]).unwrap_err();
        assert!(matches!(err, ModelLoadError::InvalidWeight { index: 0, .. }));
        assert!(TermWeightModel::with_defaults(vocab(&[("cat", 0)]), vec![-1.0]).is_err());
    }

    #[test]
    fn model_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TermWeightModel>();
    }
}
