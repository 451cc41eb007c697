use sea_orm::{sea_query::Expr, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait};
use serde::{Deserialize, Serialize};

use crate::entities::{car, user};
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct ClearImagesRequest {
    pub urls: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClearedImages {
    pub cars: u64,
    pub users: u64,
}

/// Unsets every car and user `image` that matches one of `urls`.
pub async fn clear_images(db: &DatabaseConnection, urls: Vec<String>) -> AppResult<ClearedImages> {
    let urls: Vec<String> = urls
        .into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();
    if urls.is_empty() {
        return Err(AppError::BadRequest("Please provide at least one image url".to_string()));
    }

    let txn = db.begin().await?;

    let cars = car::Entity::update_many()
        .col_expr(car::Column::Image, Expr::value(Option::<String>::None))
        .filter(car::Column::Image.is_in(urls.clone()))
        .exec(&txn)
        .await?
        .rows_affected;

    let users = user::Entity::update_many()
        .col_expr(user::Column::Image, Expr::value(Option::<String>::None))
        .filter(user::Column::Image.is_in(urls))
        .exec(&txn)
        .await?
        .rows_affected;

    txn.commit().await?;

    tracing::info!(cars, users, "Image references cleared");
    Ok(ClearedImages { cars, users })
}
