use super::{unix_now, FeedbackStore, HistoryEntry, Verdict, VerdictRecord};
use crate::error::FeedbackStoreError;
use std::collections::HashMap;
use std::path::Path;

const VERDICTS_TREE: &str = "verdicts";
const HISTORY_TREE: &str = "history";

/// Feedback kept in an embedded sled database.
///
/// Keys start with the user id, length-prefixed so that no user id can be a
/// prefix of another user's keys:
///
/// - `verdicts`: `len(user) | user | recipe_id` -> bincode [`VerdictRecord`]
/// - `history`: `len(user) | user | seq (u64 BE)` -> bincode [`HistoryEntry`]
pub struct SledFeedbackStore {
    db: sled::Db,
    verdicts: sled::Tree,
    history: sled::Tree,
}

impl SledFeedbackStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FeedbackStoreError> {
        Self::from_db(sled::open(path)?)
    }

    /// Throwaway database removed on drop.
    pub fn temporary() -> Result<Self, FeedbackStoreError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self, FeedbackStoreError> {
        let verdicts = db.open_tree(VERDICTS_TREE)?;
        let history = db.open_tree(HISTORY_TREE)?;
        Ok(Self { db, verdicts, history })
    }

    pub fn flush(&self) -> Result<(), FeedbackStoreError> {
        self.db.flush()?;
        Ok(())
    }
}

fn user_prefix(user_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + user_id.len());
    key.extend_from_slice(&(user_id.len() as u32).to_be_bytes());
    key.extend_from_slice(user_id.as_bytes());
    key
}

fn verdict_key(user_id: &str, recipe_id: &str) -> Vec<u8> {
    let mut key = user_prefix(user_id);
    key.extend_from_slice(recipe_id.as_bytes());
    key
}

impl FeedbackStore for SledFeedbackStore {
    fn verdict(&self, user_id: &str, recipe_id: &str) -> Result<Option<Verdict>, FeedbackStoreError> {
        match self.verdicts.get(verdict_key(user_id, recipe_id))? {
            Some(bytes) => {
                let record: VerdictRecord = bincode::deserialize(&bytes)?;
                Ok(Some(record.verdict))
            }
            None => Ok(None),
        }
    }

    fn set_verdict(&self, user_id: &str, recipe_id: &str, verdict: Verdict) -> Result<(), FeedbackStoreError> {
        let record = VerdictRecord { verdict, updated_at: unix_now() };
        let bytes = bincode::serialize(&record)?;
        self.verdicts.insert(verdict_key(user_id, recipe_id), bytes)?;
        Ok(())
    }

    fn verdicts(&self, user_id: &str) -> Result<HashMap<String, Verdict>, FeedbackStoreError> {
        let prefix = user_prefix(user_id);
        let mut verdicts = HashMap::new();
        for item in self.verdicts.scan_prefix(&prefix) {
            let (key, value) = item?;
            let record: VerdictRecord = bincode::deserialize(&value)?;
            verdicts.insert(String::from_utf8_lossy(&key[prefix.len()..]).into_owned(), record.verdict);
        }
        Ok(verdicts)
    }

    fn reset(&self, user_id: &str) -> Result<usize, FeedbackStoreError> {
        let mut batch = sled::Batch::default();
        let mut removed = 0usize;
        for item in self.verdicts.scan_prefix(user_prefix(user_id)) {
            let (key, _) = item?;
            batch.remove(key);
            removed += 1;
        }
        self.verdicts.apply_batch(batch)?;
        Ok(removed)
    }

    fn record_history(&self, entry: &HistoryEntry) -> Result<(), FeedbackStoreError> {
        let mut key = user_prefix(&entry.user_id);
        key.extend_from_slice(&self.db.generate_id()?.to_be_bytes());
        self.history.insert(key, bincode::serialize(entry)?)?;
        Ok(())
    }

    fn history(&self, user_id: &str) -> Result<Vec<HistoryEntry>, FeedbackStoreError> {
        self.history
            .scan_prefix(user_prefix(user_id))
            .map(|item| -> Result<HistoryEntry, FeedbackStoreError> {
                let (_, value) = item?;
                Ok(bincode::deserialize(&value)?)
            })
            .collect()
    }
}
