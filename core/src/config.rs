use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How survivors of the exclusion step are cut down to `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Best `n` by score.
    #[default]
    TopN,
    /// Uniform sample of `n` survivors, reported in rank order.
    Random,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorizerConfig {
    /// Use `1 + ln(tf)` instead of the raw count.
    pub sublinear_tf: bool,
    /// Use smoothed IDF = ln((1 + N) / (1 + df)) + 1 instead of ln(N / df) + 1
    pub smooth_idf: bool,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self { sublinear_tf: false, smooth_idf: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    pub default_results: usize,
    /// Upper bound on the requested count; a request for 0 yields nothing.
    pub max_results: usize,
    /// Candidates kept before exclusion, as a multiple of the requested count.
    /// Values below 2 are treated as 2.
    pub candidate_multiplier: usize,
    /// Candidates must score strictly above this.
    pub min_score: f32,
    pub selection_mode: SelectionMode,
    /// Also drop recipes the user already liked.
    pub exclude_liked: bool,
    /// Fixed seed for `SelectionMode::Random`; fresh entropy per call when unset.
    pub random_seed: Option<u64>,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            default_results: 3,
            max_results: 100,
            candidate_multiplier: 2,
            min_score: 0.0,
            selection_mode: SelectionMode::TopN,
            exclude_liked: false,
            random_seed: None,
        }
    }
}

/// Contents of the TOML config file shared by the server and the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub corpus: Option<String>,
    pub store: Option<String>,
    pub vectorizer: VectorizerConfig,
    pub recommender: RecommenderConfig,
}

impl AppConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml(&text)
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&str>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
