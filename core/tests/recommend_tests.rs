use recipe_core::{
    CorpusIndex, FeedbackStore, FeedbackStoreError, HistoryEntry, InvalidQueryError, MemoryFeedbackStore, Query,
    RawRecipe, Recommender, RecommenderConfig, SelectionMode, SledFeedbackStore, Verdict, VectorizerConfig,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn soup_and_pasta() -> Vec<RawRecipe> {
    vec![
        RawRecipe::new("Tomato Soup", "tomato, onion, salt"),
        RawRecipe::new("Garlic Pasta", "pasta, garlic, olive oil"),
    ]
}

fn pantry() -> Vec<RawRecipe> {
    vec![
        RawRecipe::new("Tomato Soup", "tomatoes, onion, salt, water").with_cuisine("us"),
        RawRecipe::new("Garlic Pasta", "pasta, garlic, olive oil, salt, water").with_cuisine("it"),
        RawRecipe::new("Bruschetta", "bread, tomato, garlic, basil, olive oil").with_cuisine("it"),
        RawRecipe::new("Kimchi Stew", "kimchi, pork, tofu, onion, gochugaru").with_cuisine("/Asian/KR/"),
        RawRecipe::new("Onion Rings", "onion, flour, egg, oil, salt").with_cuisine("us"),
        RawRecipe::new("Caprese", "tomato, mozzarella, basil, olive oil").with_cuisine("it"),
        RawRecipe::new("Shakshuka", "egg, tomato, onion, pepper, cumin"),
        RawRecipe::new("Plain Rice", "rice, water, salt"),
    ]
}

fn recommender(raws: Vec<RawRecipe>, store: Arc<dyn FeedbackStore>, config: RecommenderConfig) -> Recommender {
    let index = CorpusIndex::build(raws, &VectorizerConfig::default()).unwrap();
    Recommender::new(Arc::new(index), store, config)
}

fn names(rec: &Recommender, query: &Query) -> Vec<String> {
    rec.recommend(query).unwrap().into_iter().map(|r| r.recipe.name).collect()
}

#[test]
fn tomato_onion_prefers_tomato_soup() {
    let index = CorpusIndex::build(soup_and_pasta(), &VectorizerConfig::default()).unwrap();
    let ranked = index.query(&["tomato", "onion"]);
    assert_eq!(index.recipe(ranked[0].index).unwrap().name, "Tomato Soup");
    assert!(ranked[0].score > ranked[1].score);

    let rec = Recommender::new(Arc::new(index), Arc::new(MemoryFeedbackStore::new()), RecommenderConfig::default());
    let out = rec.recommend(&Query::new(["tomato", "onion"], "u1")).unwrap();
    assert_eq!(out[0].recipe.name, "Tomato Soup");
    assert_eq!(out[0].rank, 1);
}

#[test]
fn disliked_recipe_hidden_for_that_user_only() {
    let store = Arc::new(MemoryFeedbackStore::new());
    let rec = recommender(pantry(), store.clone(), RecommenderConfig::default());
    let query_u1 = Query::new(["tomato", "onion"], "u1");
    let query_u2 = Query::new(["tomato", "onion"], "u2");
    assert!(names(&rec, &query_u1).contains(&"Tomato Soup".to_string()));

    store.set_verdict("u1", "Tomato Soup", Verdict::Disliked).unwrap();
    assert!(!names(&rec, &query_u1).contains(&"Tomato Soup".to_string()));
    assert!(names(&rec, &query_u2).contains(&"Tomato Soup".to_string()));

    // Changing the verdict brings it back
    store.set_verdict("u1", "Tomato Soup", Verdict::Liked).unwrap();
    assert!(names(&rec, &query_u1).contains(&"Tomato Soup".to_string()));
}

#[test]
fn disliked_recipe_never_returned_for_any_query() {
    let store = Arc::new(MemoryFeedbackStore::new());
    store.set_verdict("u1", "Caprese", Verdict::Disliked).unwrap();
    let rec = recommender(pantry(), store, RecommenderConfig::default());
    for ingredients in [vec!["tomato", "mozzarella"], vec!["basil"], vec!["olive oil", "tomato"], vec!["salt"]] {
        for n in 1..=8 {
            let out = names(&rec, &Query::new(ingredients.clone(), "u1").with_limit(n));
            assert!(!out.contains(&"Caprese".to_string()), "{ingredients:?} n={n}");
        }
    }
}

#[test]
fn results_are_bounded_and_from_corpus() {
    let rec = recommender(pantry(), Arc::new(MemoryFeedbackStore::new()), RecommenderConfig::default());
    let corpus: Vec<String> = rec.index().recipes().iter().map(|r| r.id.clone()).collect();
    for n in 1..=10 {
        let out = rec.recommend(&Query::new(["onion", "salt"], "u1").with_limit(n)).unwrap();
        assert!(out.len() <= n);
        assert!(out.iter().all(|r| corpus.contains(&r.recipe.id)));
        let mut ids: Vec<&String> = out.iter().map(|r| &r.recipe.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), out.len());
    }
}

#[test]
fn top_n_is_idempotent() {
    let rec = recommender(pantry(), Arc::new(MemoryFeedbackStore::new()), RecommenderConfig::default());
    let query = Query::new(["tomato", "garlic", "olive oil"], "u1");
    let first = names(&rec, &query);
    assert_eq!(first.len(), 3);
    for _ in 0..5 {
        assert_eq!(names(&rec, &query), first);
    }
}

#[test]
fn scores_descend_and_ranks_ascend() {
    let rec = recommender(pantry(), Arc::new(MemoryFeedbackStore::new()), RecommenderConfig::default());
    let out = rec.recommend(&Query::new(["tomato", "basil"], "u1").with_limit(5)).unwrap();
    assert!(out.windows(2).all(|w| w[0].score >= w[1].score && w[0].rank < w[1].rank));
    assert!(out.iter().all(|r| r.score > 0.0 && r.score <= 1.0));
}

#[test]
fn cuisine_filter_narrows_pool() {
    let rec = recommender(pantry(), Arc::new(MemoryFeedbackStore::new()), RecommenderConfig::default());
    let out = rec.recommend(&Query::new(["tomato", "onion"], "u1").with_cuisine("IT").with_limit(5)).unwrap();
    assert!(!out.is_empty());
    assert!(out.iter().all(|r| r.recipe.has_cuisine("it")));

    let korean = names(&rec, &Query::new(["onion"], "u1").with_cuisine("kr"));
    assert_eq!(korean, vec!["Kimchi Stew".to_string()]);
}

#[test]
fn unknown_cuisine_is_empty_not_error() {
    let rec = recommender(soup_and_pasta(), Arc::new(MemoryFeedbackStore::new()), RecommenderConfig::default());
    let out = rec.recommend(&Query::new(["tomato"], "u1").with_cuisine("kr")).unwrap();
    assert!(out.is_empty());
}

#[test]
fn unmatched_ingredients_give_empty_result() {
    let rec = recommender(pantry(), Arc::new(MemoryFeedbackStore::new()), RecommenderConfig::default());
    assert!(rec.recommend(&Query::new(["durian"], "u1")).unwrap().is_empty());
}

#[test]
fn invalid_queries_are_rejected() {
    let rec = recommender(soup_and_pasta(), Arc::new(MemoryFeedbackStore::new()), RecommenderConfig::default());
    let no_ingredients: Vec<&str> = Vec::new();
    assert_eq!(rec.recommend(&Query::new(no_ingredients, "u1")).unwrap_err(), InvalidQueryError::EmptyIngredients);
    assert_eq!(rec.recommend(&Query::new(["  ", ""], "u1")).unwrap_err(), InvalidQueryError::EmptyIngredients);
    assert_eq!(rec.recommend(&Query::new(["tomato"], "")).unwrap_err(), InvalidQueryError::EmptyUserId);
    // only the empty id is rejected; any other string is an opaque user key
    assert!(rec.recommend(&Query::new(["tomato"], "   ")).is_ok());
}

#[test]
fn zero_limit_returns_nothing() {
    let rec = recommender(pantry(), Arc::new(MemoryFeedbackStore::new()), RecommenderConfig::default());
    assert!(rec.recommend(&Query::new(["tomato"], "u1").with_limit(0)).unwrap().is_empty());
}

#[test]
fn exclusions_are_backfilled_from_candidate_surplus() {
    let store = Arc::new(MemoryFeedbackStore::new());
    let rec = recommender(pantry(), store.clone(), RecommenderConfig::default());
    let query = Query::new(["tomato", "olive oil", "basil"], "u1");
    let before = names(&rec, &query);
    assert_eq!(before.len(), 3);

    store.set_verdict("u1", &before[0], Verdict::Disliked).unwrap();
    let after = names(&rec, &query);
    assert_eq!(after.len(), 3);
    assert_eq!(after[..2], before[1..]);
}

#[test]
fn random_mode_per_query_override() {
    let config = RecommenderConfig { random_seed: Some(3), ..RecommenderConfig::default() };
    let rec = recommender(pantry(), Arc::new(MemoryFeedbackStore::new()), config);
    let top = rec.recommend(&Query::new(["salt"], "u1").with_limit(2)).unwrap();
    let candidates: Vec<String> = rec
        .recommend(&Query::new(["salt"], "u1").with_limit(4))
        .unwrap()
        .into_iter()
        .map(|r| r.recipe.id)
        .collect();
    let sampled = rec.recommend(&Query::new(["salt"], "u1").with_limit(2).with_mode(SelectionMode::Random)).unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(sampled.len(), 2);
    assert!(sampled.iter().all(|r| candidates.contains(&r.recipe.id)));
}

#[test]
fn sled_store_backs_exclusions() {
    let store = Arc::new(SledFeedbackStore::temporary().unwrap());
    store.set_verdict("u1", "Tomato Soup", Verdict::Disliked).unwrap();
    let rec = recommender(soup_and_pasta(), store, RecommenderConfig::default());
    let out = names(&rec, &Query::new(["tomato", "onion", "garlic"], "u1"));
    assert_eq!(out, vec!["Garlic Pasta".to_string()]);
}

/// Memory store that counts every mutating call.
#[derive(Default)]
struct CountingStore {
    inner: MemoryFeedbackStore,
    writes: AtomicUsize,
}

impl FeedbackStore for CountingStore {
    fn verdict(&self, user_id: &str, recipe_id: &str) -> Result<Option<Verdict>, FeedbackStoreError> {
        self.inner.verdict(user_id, recipe_id)
    }
    fn set_verdict(&self, user_id: &str, recipe_id: &str, verdict: Verdict) -> Result<(), FeedbackStoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_verdict(user_id, recipe_id, verdict)
    }
    fn verdicts(&self, user_id: &str) -> Result<HashMap<String, Verdict>, FeedbackStoreError> {
        self.inner.verdicts(user_id)
    }
    fn reset(&self, user_id: &str) -> Result<usize, FeedbackStoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.reset(user_id)
    }
    fn record_history(&self, entry: &HistoryEntry) -> Result<(), FeedbackStoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.record_history(entry)
    }
    fn history(&self, user_id: &str) -> Result<Vec<HistoryEntry>, FeedbackStoreError> {
        self.inner.history(user_id)
    }
}

#[test]
fn recommend_never_writes_feedback() {
    let store = Arc::new(CountingStore::default());
    store.inner.set_verdict("u1", "Caprese", Verdict::Disliked).unwrap();
    let config = RecommenderConfig { exclude_liked: true, random_seed: Some(7), ..RecommenderConfig::default() };
    let rec = recommender(pantry(), store.clone(), config);

    let queries = [
        Query::new(["tomato", "onion"], "u1"),
        Query::new(["salt"], "u1").with_limit(2).with_mode(SelectionMode::Random),
        Query::new(["tomato", "basil"], "u1").with_cuisine("it"),
        Query::new(["tomato"], "u2").with_cuisine("kr"),
        Query::new(["saffron"], "u1"),
    ];
    for query in &queries {
        rec.recommend(query).unwrap();
    }
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    assert!(store.inner.history("u1").unwrap().is_empty());
    assert_eq!(store.inner.verdicts("u1").unwrap().len(), 1);
}
