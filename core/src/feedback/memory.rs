use super::{unix_now, FeedbackStore, HistoryEntry, Verdict, VerdictRecord};
use crate::error::FeedbackStoreError;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Process-local store, lost on exit.
#[derive(Default)]
pub struct MemoryFeedbackStore {
    verdicts: RwLock<HashMap<String, HashMap<String, VerdictRecord>>>,
    history: RwLock<HashMap<String, Vec<HistoryEntry>>>,
}

impl MemoryFeedbackStore {
    pub fn new() -> Self { Self::default() }
}

impl FeedbackStore for MemoryFeedbackStore {
    fn verdict(&self, user_id: &str, recipe_id: &str) -> Result<Option<Verdict>, FeedbackStoreError> {
        Ok(self
            .verdicts
            .read()
            .get(user_id)
            .and_then(|per_user| per_user.get(recipe_id))
            .map(|r| r.verdict))
    }

    fn set_verdict(&self, user_id: &str, recipe_id: &str, verdict: Verdict) -> Result<(), FeedbackStoreError> {
        let record = VerdictRecord { verdict, updated_at: unix_now() };
        self.verdicts
            .write()
            .entry(user_id.to_string())
            .or_default()
            .insert(recipe_id.to_string(), record);
        Ok(())
    }

    fn verdicts(&self, user_id: &str) -> Result<HashMap<String, Verdict>, FeedbackStoreError> {
        Ok(self
            .verdicts
            .read()
            .get(user_id)
            .map(|per_user| per_user.iter().map(|(id, r)| (id.clone(), r.verdict)).collect())
            .unwrap_or_default())
    }

    fn reset(&self, user_id: &str) -> Result<usize, FeedbackStoreError> {
        Ok(self.verdicts.write().remove(user_id).map(|m| m.len()).unwrap_or(0))
    }

    fn record_history(&self, entry: &HistoryEntry) -> Result<(), FeedbackStoreError> {
        self.history.write().entry(entry.user_id.clone()).or_default().push(entry.clone());
        Ok(())
    }

    fn history(&self, user_id: &str) -> Result<Vec<HistoryEntry>, FeedbackStoreError> {
        Ok(self.history.read().get(user_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_verdict_wins() {
        let store = MemoryFeedbackStore::new();
        store.set_verdict("u1", "soup", Verdict::Liked).unwrap();
        store.set_verdict("u1", "soup", Verdict::Disliked).unwrap();
        assert_eq!(store.verdict("u1", "soup").unwrap(), Some(Verdict::Disliked));
        assert!(store.liked_recipe_ids("u1").unwrap().is_empty());
        assert_eq!(store.disliked_recipe_ids("u1").unwrap().len(), 1);
    }

    #[test]
    fn reset_is_per_user() {
        let store = MemoryFeedbackStore::new();
        store.set_verdict("u1", "soup", Verdict::Disliked).unwrap();
        store.set_verdict("u1", "pasta", Verdict::Liked).unwrap();
        store.set_verdict("u2", "soup", Verdict::Disliked).unwrap();
        assert_eq!(store.reset("u1").unwrap(), 2);
        assert_eq!(store.reset("u1").unwrap(), 0);
        assert!(store.disliked_recipe_ids("u1").unwrap().is_empty());
        assert!(store.disliked_recipe_ids("u2").unwrap().contains("soup"));
    }

    #[test]
    fn history_keeps_order() {
        let store = MemoryFeedbackStore::new();
        store.record_history(&HistoryEntry::now("u1", "tomato", "soup")).unwrap();
        store.record_history(&HistoryEntry::now("u1", "garlic", "pasta")).unwrap();
        let ids: Vec<String> = store.history("u1").unwrap().into_iter().map(|e| e.recipe_id).collect();
        assert_eq!(ids, vec!["soup", "pasta"]);
        assert!(store.history("u2").unwrap().is_empty());
    }
}
