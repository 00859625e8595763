use crate::config::VectorizerConfig;
use crate::error::CorpusLoadError;
use crate::recipe::{normalize_cuisine, RawRecipe, Recipe};
use crate::tokenizer::tokenize;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

pub type TermId = u32;

#[derive(Debug, Clone, Copy)]
struct Posting {
    recipe: u32,
    weight: f32, // normalized tf-idf weight
}

/// Unit-length tf-idf vector. Entries are sorted by term id; absent terms are zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(TermId, f32)>,
}

impl SparseVector {
    fn normalized(mut entries: Vec<(TermId, f32)>) -> Self {
        entries.retain(|(_, w)| *w > 0.0);
        entries.sort_by_key(|(t, _)| *t);
        let norm = entries.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in entries.iter_mut() { *w /= norm; }
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[(TermId, f32)] { &self.entries }

    pub fn get(&self, term: TermId) -> f32 {
        self.entries
            .binary_search_by_key(&term, |(t, _)| *t)
            .map(|i| self.entries[i].1)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredRecipe {
    /// Position of the recipe in the corpus.
    pub index: usize,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub recipes: usize,
    pub dropped: usize,
    pub vocabulary: usize,
    pub cuisines: BTreeMap<String, usize>,
}

/// Recipes plus one tf-idf vector per recipe over their ingredient text.
///
/// Built once from the whole corpus and never mutated afterwards, so it can be
/// shared behind an `Arc` by any number of readers.
#[derive(Debug)]
pub struct CorpusIndex {
    recipes: Vec<Recipe>,
    vectors: Vec<SparseVector>,
    dictionary: HashMap<String, TermId>,
    idf: Vec<f32>,
    postings: HashMap<TermId, Vec<Posting>>, // postings sorted by recipe
    by_id: HashMap<String, usize>,
    config: VectorizerConfig,
    dropped: usize,
}

impl CorpusIndex {
    pub fn build<I>(raws: I, config: &VectorizerConfig) -> Result<Self, CorpusLoadError>
    where
        I: IntoIterator<Item = RawRecipe>,
    {
        let mut total = 0usize;
        let mut dropped = 0usize;
        let mut recipes: Vec<Recipe> = Vec::new();
        let mut counts: Vec<HashMap<TermId, u32>> = Vec::new();
        let mut dictionary: HashMap<String, TermId> = HashMap::new();
        let mut df: Vec<u32> = Vec::new();
        let mut by_id: HashMap<String, usize> = HashMap::new();

        for raw in raws {
            total += 1;
            let recipe = Recipe::from_raw(raw);
            if recipe.id.is_empty() {
                tracing::warn!(record = total, "dropping recipe without id or name");
                dropped += 1;
                continue;
            }
            let tokens = tokenize(&recipe.ingredients);
            if tokens.is_empty() {
                tracing::warn!(id = %recipe.id, "dropping recipe without usable ingredient text");
                dropped += 1;
                continue;
            }
            if by_id.contains_key(&recipe.id) {
                tracing::warn!(id = %recipe.id, "dropping duplicate recipe id, keeping first");
                dropped += 1;
                continue;
            }

            let mut tf_counts: HashMap<TermId, u32> = HashMap::new();
            for (term, _pos) in tokens {
                let tid = *dictionary.entry(term).or_insert_with(|| {
                    df.push(0);
                    (df.len() - 1) as TermId
                });
                *tf_counts.entry(tid).or_insert(0) += 1;
            }
            for tid in tf_counts.keys() {
                df[*tid as usize] += 1;
            }
            by_id.insert(recipe.id.clone(), recipes.len());
            recipes.push(recipe);
            counts.push(tf_counts);
        }

        if total == 0 {
            return Err(CorpusLoadError::Empty);
        }
        if recipes.is_empty() {
            return Err(CorpusLoadError::NoUsableRecipes { dropped });
        }

        let n = recipes.len() as f32;
        let idf: Vec<f32> = df.iter().map(|&df_t| idf_weight(n, df_t, config)).collect();
        let vectors: Vec<SparseVector> = counts
            .into_iter()
            .map(|tf_counts| weigh(tf_counts, &idf, config))
            .collect();

        let mut postings: HashMap<TermId, Vec<Posting>> = HashMap::new();
        for (i, vector) in vectors.iter().enumerate() {
            for &(tid, weight) in vector.entries() {
                postings.entry(tid).or_default().push(Posting { recipe: i as u32, weight });
            }
        }

        tracing::info!(recipes = recipes.len(), dropped, num_terms = dictionary.len(), "corpus indexed");
        Ok(Self { recipes, vectors, dictionary, idf, postings, by_id, config: config.clone(), dropped })
    }

    pub fn len(&self) -> usize { self.recipes.len() }

    pub fn is_empty(&self) -> bool { self.recipes.is_empty() }

    pub fn recipes(&self) -> &[Recipe] { &self.recipes }

    pub fn recipe(&self, index: usize) -> Option<&Recipe> { self.recipes.get(index) }

    pub fn vector(&self, index: usize) -> Option<&SparseVector> { self.vectors.get(index) }

    pub fn vocabulary_size(&self) -> usize { self.dictionary.len() }

    /// Look a recipe up by its identifier.
    pub fn find(&self, id: &str) -> Option<(usize, &Recipe)> {
        self.by_id.get(id).map(|&i| (i, &self.recipes[i]))
    }

    /// Corpus positions of recipes tagged with `cuisine`, in corpus order.
    pub fn indexes_with_cuisine(&self, cuisine: &str) -> Vec<usize> {
        let tag = normalize_cuisine(cuisine);
        self.recipes
            .iter()
            .enumerate()
            .filter(|(_, r)| r.cuisines.contains(&tag))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn stats(&self) -> IndexStats {
        let mut cuisines: BTreeMap<String, usize> = BTreeMap::new();
        for recipe in &self.recipes {
            for tag in &recipe.cuisines {
                *cuisines.entry(tag.clone()).or_insert(0) += 1;
            }
        }
        IndexStats { recipes: self.recipes.len(), dropped: self.dropped, vocabulary: self.dictionary.len(), cuisines }
    }

    /// Project query terms into the corpus vector space. Terms outside the vocabulary are ignored.
    pub fn project<S: AsRef<str>>(&self, terms: &[S]) -> SparseVector {
        let mut tf_counts: HashMap<TermId, u32> = HashMap::new();
        for text in terms {
            for (term, _pos) in tokenize(text.as_ref()) {
                if let Some(&tid) = self.dictionary.get(&term) {
                    *tf_counts.entry(tid).or_insert(0) += 1;
                }
            }
        }
        weigh(tf_counts, &self.idf, &self.config)
    }

    /// Cosine similarity of the query against every recipe, best first.
    pub fn query<S: AsRef<str>>(&self, terms: &[S]) -> Vec<ScoredRecipe> {
        let all: Vec<usize> = (0..self.recipes.len()).collect();
        self.query_within(&all, terms)
    }

    /// Like [`CorpusIndex::query`] but only over the given corpus positions.
    ///
    /// Sorted by descending score, ties in corpus order. Positions outside the
    /// corpus and repeats are ignored.
    pub fn query_within<S: AsRef<str>>(&self, pool: &[usize], terms: &[S]) -> Vec<ScoredRecipe> {
        let q = self.project(terms);

        // Aggregate scores from postings; both sides are unit length so the sum is the cosine
        let mut scores = vec![0.0f32; self.recipes.len()];
        for &(tid, q_w) in q.entries() {
            if let Some(postings) = self.postings.get(&tid) {
                for p in postings {
                    scores[p.recipe as usize] += p.weight * q_w;
                }
            }
        }

        let mut pool: Vec<usize> = pool.iter().copied().filter(|&i| i < self.recipes.len()).collect();
        pool.sort_unstable();
        pool.dedup();

        let mut ranked: Vec<ScoredRecipe> = pool
            .into_iter()
            .map(|index| ScoredRecipe { index, score: scores[index].clamp(0.0, 1.0) })
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.index.cmp(&b.index))
        });
        ranked
    }
}

fn idf_weight(n: f32, df_t: u32, config: &VectorizerConfig) -> f32 {
    let df_t = df_t as f32;
    if config.smooth_idf {
        ((1.0 + n) / (1.0 + df_t)).ln() + 1.0
    } else {
        (n / df_t.max(1.0)).ln() + 1.0
    }
}

fn weigh(tf_counts: HashMap<TermId, u32>, idf: &[f32], config: &VectorizerConfig) -> SparseVector {
    let entries = tf_counts
        .into_iter()
        .map(|(tid, tf_raw)| {
            let tf = if config.sublinear_tf { 1.0 + (tf_raw as f32).ln() } else { tf_raw as f32 };
            (tid, tf * idf.get(tid as usize).copied().unwrap_or(0.0))
        })
        .collect();
    SparseVector::normalized(entries)
}
