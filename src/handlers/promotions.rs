use std::collections::HashMap;

use axum::{
    extract::State,
    Extension,
};
use uuid::Uuid;

use crate::entities::promotion;
use crate::error::AppResult;
use crate::policy::AuthContext;
use crate::services::promotion::{self as promotions, PromotionDetail, PromotionRequest};
use crate::utils::extract::{ApiJson, ApiPath, ApiQuery};
use crate::utils::query::ListQuery;
use crate::utils::response::ApiResponse;
use crate::AppState;

pub async fn list_promotions(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<HashMap<String, String>>,
) -> AppResult<ApiResponse<Vec<serde_json::Value>>> {
    let query = ListQuery::from_params(&params)?;
    Ok(ApiResponse::page(promotions::list(&state.db, &query, None).await?))
}

pub async fn list_provider_promotions(
    State(state): State<AppState>,
    ApiPath(provider_id): ApiPath<Uuid>,
    ApiQuery(params): ApiQuery<HashMap<String, String>>,
) -> AppResult<ApiResponse<Vec<serde_json::Value>>> {
    let query = ListQuery::from_params(&params)?;
    Ok(ApiResponse::page(
        promotions::list(&state.db, &query, Some(provider_id)).await?,
    ))
}

pub async fn get_promotion(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<PromotionDetail>> {
    Ok(ApiResponse::ok(promotions::get(&state.db, id).await?))
}

pub async fn create_promotion(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(payload): ApiJson<PromotionRequest>,
) -> AppResult<ApiResponse<promotion::Model>> {
    let created = promotions::create(&state.db, &ctx, payload).await?;
    Ok(ApiResponse::created(created))
}

pub async fn update_promotion(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<PromotionRequest>,
) -> AppResult<ApiResponse<promotion::Model>> {
    Ok(ApiResponse::ok(promotions::update(&state.db, &ctx, id, payload).await?))
}

pub async fn delete_promotion(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<serde_json::Value>> {
    promotions::delete(&state.db, &ctx, id).await?;
    Ok(ApiResponse::empty())
}
