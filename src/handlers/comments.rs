use axum::{extract::State, Extension};
use uuid::Uuid;

use crate::entities::comment;
use crate::error::AppResult;
use crate::policy::AuthContext;
use crate::services::comment::{self as comments, CommentDetail, CreateCommentRequest, UpdateCommentRequest};
use crate::utils::extract::{ApiJson, ApiPath};
use crate::utils::response::ApiResponse;
use crate::AppState;

pub async fn list_comments(
    State(state): State<AppState>,
    ApiPath(car_id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<Vec<CommentDetail>>> {
    Ok(ApiResponse::collection(comments::list(&state.db, car_id).await?))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(car_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CreateCommentRequest>,
) -> AppResult<ApiResponse<comment::Model>> {
    let created = comments::create(&state.db, &ctx, car_id, payload).await?;
    Ok(ApiResponse::created(created))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateCommentRequest>,
) -> AppResult<ApiResponse<comment::Model>> {
    Ok(ApiResponse::ok(comments::update(&state.db, &ctx, id, payload).await?))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<serde_json::Value>> {
    comments::delete(&state.db, &ctx, id).await?;
    Ok(ApiResponse::empty())
}
