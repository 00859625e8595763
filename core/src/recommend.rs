//! Ingredient query -> ranked, feedback-filtered recipe selection.

use crate::config::{RecommenderConfig, SelectionMode};
use crate::error::{FeedbackStoreError, InvalidQueryError};
use crate::feedback::FeedbackStore;
use crate::index::{CorpusIndex, ScoredRecipe};
use crate::recipe::Recipe;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const MIN_CANDIDATE_MULTIPLIER: usize = 2;

#[derive(Debug, Clone, Default)]
pub struct Query {
    pub ingredients: Vec<String>,
    pub user_id: String,
    pub cuisine: Option<String>,
    /// Result count; the configured default when unset.
    pub limit: Option<usize>,
    /// Overrides the configured selection mode for this query.
    pub mode: Option<SelectionMode>,
}

impl Query {
    pub fn new<I, S>(ingredients: I, user_id: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ingredients: ingredients.into_iter().map(Into::into).collect(),
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    pub fn with_cuisine(mut self, cuisine: impl Into<String>) -> Self {
        self.cuisine = Some(cuisine.into());
        self
    }

    pub fn with_limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn with_mode(mut self, mode: SelectionMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub recipe: Recipe,
    pub score: f32,
    /// 1-based position in the similarity ranking of the candidate pool.
    pub rank: usize,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RecommenderStats {
    pub degraded_feedback_reads: u64,
}

pub struct Recommender {
    index: Arc<CorpusIndex>,
    store: Arc<dyn FeedbackStore>,
    config: RecommenderConfig,
    degraded_reads: AtomicU64,
}

impl Recommender {
    pub fn new(index: Arc<CorpusIndex>, store: Arc<dyn FeedbackStore>, config: RecommenderConfig) -> Self {
        Self { index, store, config, degraded_reads: AtomicU64::new(0) }
    }

    pub fn index(&self) -> &CorpusIndex { &self.index }

    pub fn store(&self) -> &Arc<dyn FeedbackStore> { &self.store }

    pub fn stats(&self) -> RecommenderStats {
        RecommenderStats { degraded_feedback_reads: self.degraded_reads.load(Ordering::Relaxed) }
    }

    /// Up to `n` recipes for the query, best match first.
    ///
    /// Only input validation can fail. An unreachable feedback store means no
    /// exclusions for this call; it is logged and counted in [`Recommender::stats`].
    /// Never writes to the feedback store.
    pub fn recommend(&self, query: &Query) -> Result<Vec<Recommendation>, InvalidQueryError> {
        let ingredients: Vec<&str> = query
            .ingredients
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if ingredients.is_empty() {
            return Err(InvalidQueryError::EmptyIngredients);
        }
        if query.user_id.is_empty() {
            return Err(InvalidQueryError::EmptyUserId);
        }
        let n = query.limit.unwrap_or(self.config.default_results).min(self.config.max_results);
        if n == 0 {
            return Ok(Vec::new());
        }
        let mode = query.mode.unwrap_or(self.config.selection_mode);

        let pool: Vec<usize> = match query.cuisine.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(cuisine) => {
                let pool = self.index.indexes_with_cuisine(cuisine);
                if pool.is_empty() {
                    tracing::debug!(cuisine, "no recipes for cuisine");
                    return Ok(Vec::new());
                }
                pool
            }
            None => (0..self.index.len()).collect(),
        };

        // keep k > n
        let k = n.saturating_mul(self.config.candidate_multiplier.max(MIN_CANDIDATE_MULTIPLIER));
        let candidates: Vec<(usize, ScoredRecipe)> = self
            .index
            .query_within(&pool, &ingredients)
            .into_iter()
            .enumerate()
            .map(|(pos, scored)| (pos + 1, scored))
            .filter(|(_, scored)| scored.score > self.config.min_score)
            .take(k)
            .collect();
        if candidates.is_empty() {
            tracing::debug!(pool = pool.len(), "no recipe shares a weighted ingredient with the query");
            return Ok(Vec::new());
        }

        let excluded = self.exclusions(&query.user_id);
        let survivors: Vec<(usize, ScoredRecipe)> = candidates
            .iter()
            .copied()
            .filter(|(_, scored)| !excluded.contains(&self.index.recipes()[scored.index].id))
            .collect();
        tracing::debug!(
            pool = pool.len(),
            candidates = candidates.len(),
            survivors = survivors.len(),
            n,
            ?mode,
            "ranked recipes"
        );

        Ok(self
            .select(survivors, n, mode)
            .into_iter()
            .map(|(rank, scored)| Recommendation {
                recipe: self.index.recipes()[scored.index].clone(),
                score: scored.score,
                rank,
            })
            .collect())
    }

    fn exclusions(&self, user_id: &str) -> HashSet<String> {
        let read: Result<HashSet<String>, FeedbackStoreError> = if self.config.exclude_liked {
            self.store.verdicts(user_id).map(|all| all.into_keys().collect())
        } else {
            self.store.disliked_recipe_ids(user_id)
        };
        match read {
            Ok(ids) => ids,
            Err(err) => {
                self.degraded_reads.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(user_id, error = %err, "feedback store unavailable, recommending without exclusions");
                HashSet::new()
            }
        }
    }

    fn select(&self, mut survivors: Vec<(usize, ScoredRecipe)>, n: usize, mode: SelectionMode) -> Vec<(usize, ScoredRecipe)> {
        if survivors.len() <= n {
            return survivors;
        }
        match mode {
            SelectionMode::TopN => {
                survivors.truncate(n);
                survivors
            }
            SelectionMode::Random => {
                let mut picked: Vec<(usize, ScoredRecipe)> = match self.config.random_seed {
                    Some(seed) => survivors.choose_multiple(&mut StdRng::seed_from_u64(seed), n).copied().collect(),
                    None => survivors.choose_multiple(&mut rand::thread_rng(), n).copied().collect(),
                };
                picked.sort_by_key(|(rank, _)| *rank);
                picked
            }
        }
    }
}
