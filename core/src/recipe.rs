use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One row of the recipe table as it comes off disk, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecipe {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(alias = "name", alias = "title")]
    pub recipe_name: String,
    #[serde(default)]
    pub ingredients: String,
    #[serde(default, alias = "instructions", alias = "preparation")]
    pub directions: String,
    #[serde(default, deserialize_with = "lenient_rating")]
    pub rating: Option<f32>,
    #[serde(default, alias = "image", alias = "image_url")]
    pub img_src: Option<String>,
    #[serde(default, alias = "cuisines", alias = "cuisine_path", alias = "country")]
    pub cuisine: Option<String>,
}

impl RawRecipe {
    pub fn new(name: impl Into<String>, ingredients: impl Into<String>) -> Self {
        Self { recipe_name: name.into(), ingredients: ingredients.into(), ..Self::default() }
    }

    pub fn with_cuisine(mut self, cuisine: impl Into<String>) -> Self {
        self.cuisine = Some(cuisine.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Explicit id when present and non-blank, otherwise the recipe name.
    pub fn identifier(&self) -> String {
        match self.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => self.recipe_name.trim().to_string(),
        }
    }
}

// CSV exports leave the rating column blank or fill it with text now and then.
fn lenient_rating<'de, D>(de: D) -> Result<Option<f32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f32),
        Text(String),
    }
    Ok(match Option::<Raw>::deserialize(de)? {
        Some(Raw::Num(v)) => Some(v),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub ingredients: String,
    pub directions: String,
    pub rating: f32,
    pub img_src: Option<String>,
    pub cuisines: BTreeSet<String>,
}

impl Recipe {
    pub(crate) fn from_raw(raw: RawRecipe) -> Self {
        let id = raw.identifier();
        let cuisines = raw.cuisine.as_deref().map(parse_cuisine_tags).unwrap_or_default();
        Self {
            id,
            name: raw.recipe_name.trim().to_string(),
            ingredients: raw.ingredients.trim().to_string(),
            directions: raw.directions,
            rating: raw.rating.unwrap_or(0.0),
            img_src: raw.img_src.filter(|s| !s.trim().is_empty()),
            cuisines,
        }
    }

    pub fn has_cuisine(&self, tag: &str) -> bool {
        self.cuisines.contains(&normalize_cuisine(tag))
    }
}

pub fn normalize_cuisine(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// Tags are separated by `,`, `/`, `|` or `;` (`/Asian/Korean/` style paths included).
pub fn parse_cuisine_tags(raw: &str) -> BTreeSet<String> {
    raw.split([',', '/', '|', ';'])
        .map(normalize_cuisine)
        .filter(|s| !s.is_empty())
        .collect()
}
