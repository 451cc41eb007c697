use axum::extract::State;

use crate::error::AppResult;
use crate::services::image::{self, ClearImagesRequest, ClearedImages};
use crate::utils::extract::ApiJson;
use crate::utils::response::ApiResponse;
use crate::AppState;

/// Remove image references from cars and users (admin)
pub async fn clear_images(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ClearImagesRequest>,
) -> AppResult<ApiResponse<ClearedImages>> {
    Ok(ApiResponse::ok(image::clear_images(&state.db, payload.urls).await?))
}
