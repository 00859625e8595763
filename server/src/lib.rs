use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use recipe_core::{
    build_index, open_store, AppConfig, HistoryEntry, IndexStats, InvalidQueryError, Query, Recipe, Recommender,
    RecommenderStats, SelectionMode, Verdict,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path as FsPath;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const USER_HEADER: &str = "X-User-Id";

/// Either `"tomato, onion"` or `["tomato", "onion"]`.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum IngredientsInput {
    Text(String),
    List(Vec<String>),
}

impl IngredientsInput {
    fn into_list(self) -> Vec<String> {
        match self {
            IngredientsInput::Text(raw) => recipe_core::tokenizer::parse_ingredient_list(&raw),
            IngredientsInput::List(items) => items.into_iter().map(|s| s.trim().to_string()).collect(),
        }
    }
}

#[derive(Deserialize)]
pub struct RecipesRequest {
    pub ingredients: IngredientsInput,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub n: Option<usize>,
    #[serde(default)]
    pub mode: Option<SelectionMode>,
}

#[derive(Serialize)]
pub struct RecipeCard {
    pub recipe_id: String,
    pub recipe_name: String,
    pub instructions: String,
    pub rating: f32,
    pub img_src: Option<String>,
    pub cuisines: BTreeSet<String>,
    pub score: f32,
    pub rank: usize,
}

#[derive(Deserialize)]
pub struct RateRequest {
    #[serde(default)]
    pub recipe_id: Option<String>,
    #[serde(default)]
    pub recipe_name: Option<String>,
    pub rating: i64,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Deserialize)]
pub struct UserRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub index: IndexStats,
    pub recommender: RecommenderStats,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl std::fmt::Display) -> ApiError {
    (status, Json(serde_json::json!({ "error": message.to_string() })))
}

#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
}

/// Load the corpus and open the feedback store named by `config`.
pub fn build_recommender(config: &AppConfig) -> Result<Recommender> {
    let corpus = config
        .corpus
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("no corpus configured (--corpus or `corpus` in the config file)"))?;
    let index = build_index(corpus, &config.vectorizer)?;
    let store = open_store(config.store.as_deref().map(FsPath::new))?;
    Ok(Recommender::new(Arc::new(index), store, config.recommender.clone()))
}

pub fn build_app(recommender: Arc<Recommender>) -> Router {
    let app_state = AppState { recommender };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/stats", get(stats_handler))
        .route("/recipes", post(recipes_handler))
        .route("/recipes/:recipe_id", get(recipe_handler))
        .route("/rate", post(rate_handler))
        .route("/reset", post(reset_handler))
        .route("/history", get(history_handler))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Body field first, then the `X-User-Id` header.
fn resolve_user(body_user: Option<String>, headers: &HeaderMap) -> Result<String, ApiError> {
    body_user
        .filter(|u| !u.trim().is_empty())
        .or_else(|| {
            headers
                .get(USER_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|u| !u.trim().is_empty())
                .map(str::to_string)
        })
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, InvalidQueryError::EmptyUserId))
}

pub async fn recipes_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RecipesRequest>,
) -> Result<Json<Vec<RecipeCard>>, ApiError> {
    let user_id = resolve_user(req.user_id, &headers)?;
    let ingredients = req.ingredients.into_list();
    let query = Query { ingredients, user_id, cuisine: req.cuisine, limit: req.n, mode: req.mode };

    let recommendations = state
        .recommender
        .recommend(&query)
        .map_err(|err| api_error(StatusCode::BAD_REQUEST, err))?;

    // Remember what was served; a failed write costs the log entry, not the response
    let submitted = query.ingredients.join(", ");
    for rec in &recommendations {
        let entry = HistoryEntry::now(&query.user_id, &submitted, &rec.recipe.id);
        if let Err(err) = state.recommender.store().record_history(&entry) {
            tracing::warn!(user_id = %query.user_id, error = %err, "failed to record history");
        }
    }

    let cards = recommendations
        .into_iter()
        .map(|rec| RecipeCard {
            recipe_id: rec.recipe.id,
            recipe_name: rec.recipe.name,
            instructions: rec.recipe.directions,
            rating: rec.recipe.rating,
            img_src: rec.recipe.img_src,
            cuisines: rec.recipe.cuisines,
            score: rec.score,
            rank: rec.rank,
        })
        .collect();
    Ok(Json(cards))
}

pub async fn recipe_handler(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
) -> Result<Json<Recipe>, ApiError> {
    state
        .recommender
        .index()
        .find(&recipe_id)
        .map(|(_, recipe)| Json(recipe.clone()))
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("unknown recipe: {recipe_id}")))
}

pub async fn rate_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = resolve_user(req.user_id, &headers)?;
    let verdict = Verdict::from_rating(req.rating).map_err(|err| api_error(StatusCode::BAD_REQUEST, err))?;
    let key = req
        .recipe_id
        .or(req.recipe_name)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "recipe_id or recipe_name is required"))?;

    let index = state.recommender.index();
    let recipe_id = index
        .find(&key)
        .map(|(_, r)| r.id.clone())
        .or_else(|| index.recipes().iter().find(|r| r.name == key).map(|r| r.id.clone()))
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("unknown recipe: {key}")))?;

    state
        .recommender
        .store()
        .set_verdict(&user_id, &recipe_id, verdict)
        .map_err(|err| api_error(StatusCode::SERVICE_UNAVAILABLE, err))?;
    tracing::info!(%user_id, %recipe_id, ?verdict, "verdict recorded");
    Ok(Json(serde_json::json!({ "message": "Rating saved successfully.", "recipe_id": recipe_id, "verdict": verdict })))
}

pub async fn reset_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<UserRequest>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let body_user = body.and_then(|Json(req)| req.user_id);
    let user_id = resolve_user(body_user, &headers)?;
    let removed = state
        .recommender
        .store()
        .reset(&user_id)
        .map_err(|err| api_error(StatusCode::SERVICE_UNAVAILABLE, err))?;
    tracing::info!(%user_id, removed, "preferences reset");
    Ok(Json(serde_json::json!({ "message": "Preferences have been reset successfully.", "removed": removed })))
}

pub async fn history_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let user_id = resolve_user(None, &headers)?;
    state
        .recommender
        .store()
        .history(&user_id)
        .map(Json)
        .map_err(|err| api_error(StatusCode::SERVICE_UNAVAILABLE, err))
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse { index: state.recommender.index().stats(), recommender: state.recommender.stats() })
}
