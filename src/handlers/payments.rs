use axum::{extract::State, Extension};
use uuid::Uuid;

use crate::entities::booking;
use crate::error::AppResult;
use crate::policy::AuthContext;
use crate::services::payment;
use crate::utils::extract::ApiPath;
use crate::utils::response::ApiResponse;
use crate::AppState;

/// Payment gateway callback; marks the booking completed
pub async fn verify_payment(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<ApiResponse<booking::Model>> {
    Ok(ApiResponse::ok(payment::verify(&state.db, &ctx, id).await?))
}
