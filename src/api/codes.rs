//! Code lookup endpoints - NAMASTE to ICD-11 search

use std::collections::HashMap;
use std::sync::Arc;
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::terminology::{Category, CodeMapping, CodeRegistry, SearchOptions};

pub fn routes() -> Router {
    Router::new()
        .route("/search", get(search_codes))
        .route("/stats", get(code_stats))
        .route("/:code", get(get_code))
}

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
    category: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Serialize)]
struct CodeSearchResponse {
    results: Vec<CodeMapping>,
    total: usize,
}

async fn search_codes(
    Query(params): Query<SearchParams>,
    Extension(registry): Extension<Arc<CodeRegistry>>,
) -> Result<Json<CodeSearchResponse>, (StatusCode, String)> {
    let category = match params.category.as_deref() {
        Some(raw) => Some(
            Category::parse(raw)
                .ok_or_else(|| (StatusCode::BAD_REQUEST, format!("Unknown category: {}", raw)))?,
        ),
        None => None,
    };

    let opts = SearchOptions {
        query: params.q.filter(|q| !q.is_empty()),
        category,
        limit: params.limit.unwrap_or(SearchOptions::DEFAULT_LIMIT),
        offset: params.offset.unwrap_or(0),
    };

    let results = registry.search(&opts).await;
    Ok(Json(CodeSearchResponse {
        total: results.len(),
        results,
    }))
}

async fn get_code(
    Path(code): Path<String>,
    Extension(registry): Extension<Arc<CodeRegistry>>,
) -> Result<Json<CodeMapping>, (StatusCode, String)> {
    registry
        .get(&code)
        .await
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Code not found".to_string()))
}

#[derive(Serialize)]
struct CodeStats {
    total: usize,
    by_category: HashMap<String, usize>,
}

async fn code_stats(Extension(registry): Extension<Arc<CodeRegistry>>) -> Json<CodeStats> {
    let by_category = registry
        .counts_by_category()
        .await
        .into_iter()
        .map(|(category, count)| (category.as_str().to_string(), count))
        .collect();

    Json(CodeStats {
        total: registry.count().await,
        by_category,
    })
}
