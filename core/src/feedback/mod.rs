//! Per-user like/dislike verdicts and the log of recipes served to each user.

mod memory;
mod persistent;

pub use memory::MemoryFeedbackStore;
pub use persistent::SledFeedbackStore;

use crate::error::FeedbackStoreError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Liked,
    Disliked,
}

impl Verdict {
    /// Map a 1..=5 star rating: one star is a dislike, anything higher a like.
    pub fn from_rating(rating: i64) -> Result<Self, FeedbackStoreError> {
        match rating {
            1 => Ok(Verdict::Disliked),
            2..=5 => Ok(Verdict::Liked),
            other => Err(FeedbackStoreError::InvalidRating(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictRecord {
    pub verdict: Verdict,
    /// Unix seconds of the last write.
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub user_id: String,
    pub ingredients: String,
    pub recipe_id: String,
    /// Unix seconds.
    pub recorded_at: i64,
}

impl HistoryEntry {
    pub fn now(user_id: &str, ingredients: &str, recipe_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ingredients: ingredients.to_string(),
            recipe_id: recipe_id.to_string(),
            recorded_at: unix_now(),
        }
    }
}

/// Sled store at `path`, or a process-local store when no path is given.
pub fn open_store(path: Option<&Path>) -> Result<Arc<dyn FeedbackStore>, FeedbackStoreError> {
    match path {
        Some(p) => {
            tracing::info!(path = %p.display(), "opening feedback store");
            Ok(Arc::new(SledFeedbackStore::open(p)?))
        }
        None => {
            tracing::warn!("no feedback store path configured, feedback is kept in memory only");
            Ok(Arc::new(MemoryFeedbackStore::new()))
        }
    }
}

pub(crate) fn unix_now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

/// Storage for user feedback. Implementations synchronize internally and hold
/// at most one verdict per (user, recipe) pair.
pub trait FeedbackStore: Send + Sync {
    fn verdict(&self, user_id: &str, recipe_id: &str) -> Result<Option<Verdict>, FeedbackStoreError>;

    /// Upsert: replaces any earlier verdict for the pair.
    fn set_verdict(&self, user_id: &str, recipe_id: &str, verdict: Verdict) -> Result<(), FeedbackStoreError>;

    /// Every verdict the user currently holds, keyed by recipe id.
    fn verdicts(&self, user_id: &str) -> Result<HashMap<String, Verdict>, FeedbackStoreError>;

    /// Drop every verdict of the user; returns how many were removed.
    fn reset(&self, user_id: &str) -> Result<usize, FeedbackStoreError>;

    fn record_history(&self, entry: &HistoryEntry) -> Result<(), FeedbackStoreError>;

    /// The user's history, oldest first.
    fn history(&self, user_id: &str) -> Result<Vec<HistoryEntry>, FeedbackStoreError>;

    /// All recipe ids the user currently has `verdict` on.
    fn recipe_ids_with(&self, user_id: &str, verdict: Verdict) -> Result<HashSet<String>, FeedbackStoreError> {
        Ok(self
            .verdicts(user_id)?
            .into_iter()
            .filter(|(_, v)| *v == verdict)
            .map(|(id, _)| id)
            .collect())
    }

    fn disliked_recipe_ids(&self, user_id: &str) -> Result<HashSet<String>, FeedbackStoreError> {
        self.recipe_ids_with(user_id, Verdict::Disliked)
    }

    fn liked_recipe_ids(&self, user_id: &str) -> Result<HashSet<String>, FeedbackStoreError> {
        self.recipe_ids_with(user_id, Verdict::Liked)
    }
}
