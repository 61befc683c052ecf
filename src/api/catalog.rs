use axum::{
    Json,
    extract::{Query, State},
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, ProductQuery};

const MAX_SUGGESTIONS: u64 = 20;

/// GET /products?q=
pub async fn product_suggestions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let limit = query.limit.unwrap_or(10).clamp(1, MAX_SUGGESTIONS);
    let names = state
        .requisition_service()
        .product_suggestions(&query.q, limit)
        .await?;

    Ok(Json(ApiResponse::success(names)))
}
