use std::collections::HashMap;

use axum::{
    extract::State,
    Extension,
};
use uuid::Uuid;

use crate::entities::booking as booking_entity;
use crate::error::{AppError, AppResult};
use crate::policy::AuthContext;
use crate::services::booking::{
    self, BookingDetail, BookingTarget, CreateBookingRequest, UpdateBookingRequest,
};
use crate::utils::extract::{ApiJson, ApiPath, ApiQuery};
use crate::utils::response::ApiResponse;
use crate::AppState;

fn provider_param(params: &HashMap<String, String>) -> AppResult<Option<Uuid>> {
    params
        .get("provider")
        .map(|raw| {
            raw.parse()
                .map_err(|_| AppError::BadRequest(format!("Invalid provider id: {}", raw)))
        })
        .transpose()
}

/// List bookings visible to the caller, optionally `?provider=<id>`
pub async fn list_bookings(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiQuery(params): ApiQuery<HashMap<String, String>>,
) -> AppResult<ApiResponse<Vec<BookingDetail>>> {
    let provider = provider_param(&params)?;
    let bookings = booking::list(&state.db, &ctx, provider).await?;
    Ok(ApiResponse::collection(bookings))
}

pub async fn list_provider_bookings(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(provider_id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<Vec<BookingDetail>>> {
    let bookings = booking::list(&state.db, &ctx, Some(provider_id)).await?;
    Ok(ApiResponse::collection(bookings))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<BookingDetail>> {
    Ok(ApiResponse::ok(booking::get(&state.db, &ctx, id).await?))
}

/// Book the car named in the body
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(payload): ApiJson<CreateBookingRequest>,
) -> AppResult<ApiResponse<booking_entity::Model>> {
    let car_id = payload
        .car
        .ok_or_else(|| AppError::BadRequest("Please specify a car".to_string()))?;
    let created = booking::create(&state.db, &ctx, BookingTarget::Car(car_id), payload).await?;
    Ok(ApiResponse::created(created))
}

pub async fn create_car_booking(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(car_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CreateBookingRequest>,
) -> AppResult<ApiResponse<booking_entity::Model>> {
    let created = booking::create(&state.db, &ctx, BookingTarget::Car(car_id), payload).await?;
    Ok(ApiResponse::created(created))
}

pub async fn create_provider_booking(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(provider_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CreateBookingRequest>,
) -> AppResult<ApiResponse<booking_entity::Model>> {
    let created =
        booking::create(&state.db, &ctx, BookingTarget::Provider(provider_id), payload).await?;
    Ok(ApiResponse::created(created))
}

pub async fn update_booking(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateBookingRequest>,
) -> AppResult<ApiResponse<booking_entity::Model>> {
    Ok(ApiResponse::ok(booking::update(&state.db, &ctx, id, payload).await?))
}

pub async fn delete_booking(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<serde_json::Value>> {
    booking::delete(&state.db, &ctx, id).await?;
    Ok(ApiResponse::empty())
}
