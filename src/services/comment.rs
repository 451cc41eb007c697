use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::car::find_car;
use crate::entities::booking::BookingStatus;
use crate::entities::{booked_car, booking, comment, user};
use crate::error::{AppError, AppResult};
use crate::policy::{can_comment, can_delete_comment, can_update_comment, AuthContext};

const MAX_RATING: i32 = 5;

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub comment: String,
    pub rating: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCommentRequest {
    pub comment: Option<String>,
    pub rating: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentAuthor {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
}

impl From<user::Model> for CommentAuthor {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            image: user.image,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentDetail {
    #[serde(flatten)]
    pub comment: comment::Model,
    pub user: Option<CommentAuthor>,
}

fn check_text(text: &str) -> AppResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::Unprocessable("Please add a comment".to_string()));
    }
    Ok(trimmed.to_string())
}

fn check_rating(rating: i32) -> AppResult<i32> {
    if !(0..=MAX_RATING).contains(&rating) {
        return Err(AppError::Unprocessable(format!(
            "Rating must be between 0 and {}",
            MAX_RATING
        )));
    }
    Ok(rating)
}

fn already_commented(user_id: Uuid) -> AppError {
    AppError::Conflict(format!(
        "The user with ID {} has already commented on this car",
        user_id
    ))
}

async fn find_comment(db: &DatabaseConnection, id: Uuid) -> AppResult<comment::Model> {
    comment::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No comment with the id of {}", id)))
}

/// Comments on a car, newest first, each with its author's public fields.
pub async fn list(db: &DatabaseConnection, car_id: Uuid) -> AppResult<Vec<CommentDetail>> {
    find_car(db, car_id).await?;

    let rows = comment::Entity::find()
        .filter(comment::Column::CarId.eq(car_id))
        .find_also_related(user::Entity)
        .order_by_desc(comment::Column::CreatedAt)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(comment, author)| CommentDetail {
            comment,
            user: author.map(CommentAuthor::from),
        })
        .collect())
}

pub async fn create(
    db: &DatabaseConnection,
    actor: &AuthContext,
    car_id: Uuid,
    payload: CreateCommentRequest,
) -> AppResult<comment::Model> {
    let car = find_car(db, car_id).await?;
    let text = check_text(&payload.comment)?;
    let rating = check_rating(payload.rating)?;

    let completed = booking::Entity::find()
        .filter(booking::Column::UserId.eq(actor.id()))
        .filter(booking::Column::CarId.eq(car.id))
        .filter(booking::Column::Status.eq(BookingStatus::Completed))
        .count(db)
        .await?;
    let booked = booked_car::Entity::find_by_id((actor.id(), car.id))
        .one(db)
        .await?;

    can_comment(actor, completed > 0, booked.is_some()).into_result()?;

    let existing = comment::Entity::find()
        .filter(comment::Column::UserId.eq(actor.id()))
        .filter(comment::Column::CarId.eq(car.id))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(already_commented(actor.id()));
    }

    let new_comment = comment::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(actor.id()),
        car_id: Set(car.id),
        comment: Set(text),
        rating: Set(rating),
        created_at: Set(Utc::now().into()),
    };

    new_comment.insert(db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => already_commented(actor.id()),
        _ => AppError::Database(e),
    })
}

pub async fn update(
    db: &DatabaseConnection,
    actor: &AuthContext,
    id: Uuid,
    payload: UpdateCommentRequest,
) -> AppResult<comment::Model> {
    let comment = find_comment(db, id).await?;
    can_update_comment(actor, &comment).into_result()?;

    let mut active: comment::ActiveModel = comment.into();
    if let Some(text) = payload.comment {
        active.comment = Set(check_text(&text)?);
    }
    if let Some(rating) = payload.rating {
        active.rating = Set(check_rating(rating)?);
    }

    Ok(active.update(db).await?)
}

pub async fn delete(db: &DatabaseConnection, actor: &AuthContext, id: Uuid) -> AppResult<()> {
    let comment = find_comment(db, id).await?;
    can_delete_comment(actor, &comment).into_result()?;

    comment::Entity::delete_by_id(comment.id).exec(db).await?;
    Ok(())
}
