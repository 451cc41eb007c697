use std::collections::HashMap;

use axum::{
    extract::State,
    Extension,
};
use uuid::Uuid;

use crate::entities::rental_car_provider;
use crate::error::AppResult;
use crate::policy::AuthContext;
use crate::services::provider::{self, CascadeReport, CreateProviderRequest, UpdateProviderRequest};
use crate::utils::extract::{ApiJson, ApiPath, ApiQuery};
use crate::utils::query::ListQuery;
use crate::utils::response::ApiResponse;
use crate::AppState;

pub async fn list_providers(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<HashMap<String, String>>,
) -> AppResult<ApiResponse<Vec<serde_json::Value>>> {
    let query = ListQuery::from_params(&params)?;
    let page = provider::list(&state.db, &query).await?;
    Ok(ApiResponse::page(page))
}

pub async fn get_provider(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<rental_car_provider::Model>> {
    Ok(ApiResponse::ok(provider::get(&state.db, id).await?))
}

pub async fn create_provider(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(payload): ApiJson<CreateProviderRequest>,
) -> AppResult<ApiResponse<rental_car_provider::Model>> {
    let created = provider::create(&state.db, &ctx, payload).await?;
    Ok(ApiResponse::created(created))
}

pub async fn update_provider(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateProviderRequest>,
) -> AppResult<ApiResponse<rental_car_provider::Model>> {
    Ok(ApiResponse::ok(provider::update(&state.db, &ctx, id, payload).await?))
}

/// Delete a provider and everything listed under it
pub async fn delete_provider(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<CascadeReport>> {
    Ok(ApiResponse::ok(provider::delete(&state.db, &ctx, id).await?))
}
