use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","after","all","an","and","any","as","at",
            "be","but","by","can","each","for","from","if","in","into","is","it","its",
            "more","no","not","of","off","on","or","other","some","such",
            "than","that","the","then","this","to","until","very","with","without",
        ];
        words.iter().copied().collect()
    };
    // Quantities and units carry no signal about which dish an ingredient list describes.
    static ref MEASURES: HashSet<&'static str> = {
        let words: &[&str] = &[
            "cup","cups","tablespoon","tablespoons","tbsp","teaspoon","teaspoons","tsp",
            "ounce","ounces","oz","pound","pounds","lb","lbs","gram","grams","g","kg",
            "ml","l","liter","liters","pinch","dash","package","packages","pkg",
            "large","medium","small","whole","taste","optional","divided",
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) || MEASURES.contains(token) }

/// Tokenize text into (term, position) using NFKC normalization, lowercase, stopword removal, and stemming.
pub fn tokenize(text: &str) -> Vec<(String, usize)> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let mut tokens = Vec::new();
    for (pos, mat) in RE.find_iter(&normalized).enumerate() {
        let token = mat.as_str();
        if is_stopword(token) { continue; }
        let stem = STEMMER.stem(token).to_string();
        tokens.push((stem, pos));
    }
    tokens
}

/// Terms of `text` without positions, in order of appearance.
pub fn terms(text: &str) -> Vec<String> {
    tokenize(text).into_iter().map(|(t, _)| t).collect()
}

/// Split a free-text ingredient list on commas, trimming pieces and dropping blanks.
pub fn parse_ingredient_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
