use std::collections::HashMap;

use axum::{
    extract::State,
    Extension,
};
use uuid::Uuid;

use crate::entities::car;
use crate::error::AppResult;
use crate::policy::AuthContext;
use crate::services::car::{self as cars, CarDetail, CreateCarRequest, UpdateCarRequest};
use crate::utils::extract::{ApiJson, ApiPath, ApiQuery};
use crate::utils::query::ListQuery;
use crate::utils::response::ApiResponse;
use crate::AppState;

/// List every car
pub async fn list_cars(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<HashMap<String, String>>,
) -> AppResult<ApiResponse<Vec<serde_json::Value>>> {
    let query = ListQuery::from_params(&params)?;
    Ok(ApiResponse::page(cars::list(&state.db, &query, None).await?))
}

/// List the cars of one provider
pub async fn list_provider_cars(
    State(state): State<AppState>,
    ApiPath(provider_id): ApiPath<Uuid>,
    ApiQuery(params): ApiQuery<HashMap<String, String>>,
) -> AppResult<ApiResponse<Vec<serde_json::Value>>> {
    let query = ListQuery::from_params(&params)?;
    Ok(ApiResponse::page(cars::list(&state.db, &query, Some(provider_id)).await?))
}

pub async fn get_car(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<CarDetail>> {
    Ok(ApiResponse::ok(cars::get(&state.db, id).await?))
}

pub async fn create_car(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(provider_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CreateCarRequest>,
) -> AppResult<ApiResponse<car::Model>> {
    let created = cars::create(&state.db, &ctx, provider_id, payload).await?;
    Ok(ApiResponse::created(created))
}

pub async fn update_car(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateCarRequest>,
) -> AppResult<ApiResponse<car::Model>> {
    Ok(ApiResponse::ok(cars::update(&state.db, &ctx, id, payload).await?))
}

pub async fn delete_car(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<serde_json::Value>> {
    cars::delete(&state.db, &ctx, id).await?;
    Ok(ApiResponse::empty())
}
