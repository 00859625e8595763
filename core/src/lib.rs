//! Ingredient-similarity recipe retrieval with per-user feedback filtering.
//!
//! Build a [`CorpusIndex`] once from raw recipe records, then hand it to a
//! [`Recommender`] together with a [`FeedbackStore`].

pub mod config;
pub mod error;
pub mod feedback;
pub mod index;
pub mod loader;
pub mod recipe;
pub mod recommend;
pub mod tokenizer;

pub use config::{AppConfig, RecommenderConfig, SelectionMode, VectorizerConfig};
pub use error::{ConfigError, CorpusLoadError, FeedbackStoreError, InvalidQueryError};
pub use feedback::{open_store, FeedbackStore, HistoryEntry, MemoryFeedbackStore, SledFeedbackStore, Verdict};
pub use index::{CorpusIndex, IndexStats, ScoredRecipe, SparseVector, TermId};
pub use loader::{build_index, load_path};
pub use recipe::{RawRecipe, Recipe};
pub use recommend::{Query, Recommendation, Recommender, RecommenderStats};
