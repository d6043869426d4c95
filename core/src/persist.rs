use crate::error::ModelLoadError;
use crate::model::{TermId, TermWeightModel, WeightingConfig};
use crate::tokenizer::TokenizerConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

pub const MODEL_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    pub version: u32,
    pub created_at: String,
    pub num_terms: usize,
    #[serde(default)]
    pub tokenizer: TokenizerConfig,
    #[serde(default)]
    pub weighting: WeightingConfig,
}

impl ModelMeta {
    pub fn for_model(model: &TermWeightModel, created_at: impl Into<String>) -> Self {
        Self {
            version: MODEL_FORMAT_VERSION,
            created_at: created_at.into(),
            num_terms: model.len(),
            tokenizer: model.tokenizer_config().clone(),
            weighting: model.weighting().clone(),
        }
    }
}

/// Interchange form of a pretrained model: the vocabulary and idf arrays an
/// exporter dumps from an existing vectorizer, plus optional policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub vocabulary: HashMap<String, TermId>,
    pub idf: Vec<f64>,
    #[serde(default)]
    pub tokenizer: TokenizerConfig,
    #[serde(default)]
    pub weighting: WeightingConfig,
}

impl ModelBundle {
    pub fn into_model(self) -> Result<TermWeightModel, ModelLoadError> {
        TermWeightModel::new(self.vocabulary, self.idf, self.tokenizer, self.weighting)
    }
}

pub struct ModelPaths {
    pub root: PathBuf,
}

impl ModelPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn vocabulary(&self) -> PathBuf { self.root.join("vocabulary.bin") }
    pub fn idf(&self) -> PathBuf { self.root.join("idf.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> ModelLoadError + '_ {
    move |source| ModelLoadError::Io { path: path.to_path_buf(), source }
}

fn decode_err<E: std::fmt::Display>(path: &Path) -> impl FnOnce(E) -> ModelLoadError + '_ {
    move |e| ModelLoadError::Decode { path: path.to_path_buf(), message: e.to_string() }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, ModelLoadError> {
    let mut f = File::open(path).map_err(io_err(path))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf).map_err(io_err(path))?;
    Ok(buf)
}

fn write_bytes(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut f = File::create(path)?;
    f.write_all(bytes)?;
    Ok(())
}

pub fn save_vocabulary(paths: &ModelPaths, vocabulary: &HashMap<String, TermId>) -> io::Result<()> {
    create_dir_all(&paths.root)?;
    let bytes = bincode::serialize(vocabulary).map_err(io::Error::other)?;
    write_bytes(&paths.vocabulary(), &bytes)
}

pub fn load_vocabulary(paths: &ModelPaths) -> Result<HashMap<String, TermId>, ModelLoadError> {
    let path = paths.vocabulary();
    let buf = read_bytes(&path)?;
    bincode::deserialize(&buf).map_err(decode_err(&path))
}

pub fn save_idf(paths: &ModelPaths, idf: &[f64]) -> io::Result<()> {
    create_dir_all(&paths.root)?;
    let bytes = bincode::serialize(idf).map_err(io::Error::other)?;
    write_bytes(&paths.idf(), &bytes)
}

pub fn load_idf(paths: &ModelPaths) -> Result<Vec<f64>, ModelLoadError> {
    let path = paths.idf();
    let buf = read_bytes(&path)?;
    bincode::deserialize(&buf).map_err(decode_err(&path))
}

pub fn save_meta(paths: &ModelPaths, meta: &ModelMeta) -> io::Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta).map_err(io::Error::other)?;
    write_bytes(&paths.meta(), json.as_bytes())
}

/// `Ok(None)` when the model directory carries no `meta.json`.
pub fn load_meta(paths: &ModelPaths) -> Result<Option<ModelMeta>, ModelLoadError> {
    let path = paths.meta();
    if !path.exists() {
        return Ok(None);
    }
    let buf = read_bytes(&path)?;
    let meta: ModelMeta = serde_json::from_slice(&buf).map_err(decode_err(&path))?;
    if meta.version != MODEL_FORMAT_VERSION {
        return Err(ModelLoadError::Meta(format!(
            "unsupported format version {} (expected {MODEL_FORMAT_VERSION})",
            meta.version
        )));
    }
    Ok(Some(meta))
}

/// Write all three artifacts for `model`.
pub fn save_model(paths: &ModelPaths, model: &TermWeightModel, created_at: &str) -> io::Result<()> {
    save_vocabulary(paths, model.vocabulary().as_map())?;
    save_idf(paths, model.idf().as_slice())?;
    save_meta(paths, &ModelMeta::for_model(model, created_at))
}

/// Load and validate a model directory. Any failure here is fatal to startup.
pub fn load_model(paths: &ModelPaths) -> Result<TermWeightModel, ModelLoadError> {
    let vocabulary = load_vocabulary(paths)?;
    let idf = load_idf(paths)?;
    let (tokenizer, weighting) = match load_meta(paths)? {
        Some(meta) => {
            if meta.num_terms != vocabulary.len() {
                return Err(ModelLoadError::Meta(format!(
                    "meta.json records {} terms but the vocabulary has {}",
                    meta.num_terms,
                    vocabulary.len()
                )));
            }
            (meta.tokenizer, meta.weighting)
        }
        None => (TokenizerConfig::default(), WeightingConfig::default()),
    };
    let model = TermWeightModel::new(vocabulary, idf, tokenizer, weighting)?;
    tracing::info!(root = %paths.root.display(), num_terms = model.len(), "loaded term-weight model");
    Ok(model)
}

/// Read an interchange bundle from a JSON file.
pub fn load_bundle_json(path: &Path) -> Result<ModelBundle, ModelLoadError> {
    let buf = read_bytes(path)?;
    serde_json::from_slice(&buf).map_err(decode_err(path))
}
