use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::user::{self, UserRole};
use crate::entities::{booked_car, car};
use crate::error::{AppError, AppResult};
use crate::policy::AuthContext;
use crate::utils::jwt::verify_token;
use crate::utils::password::{hash_password, verify_password};

const MIN_PASSWORD_LEN: usize = 6;
const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    #[serde(alias = "telephoneNumber")]
    pub telephone_number: String,
    pub email: String,
    pub password: String,
    pub role: Option<UserRole>,
}

/// The account as returned by `/auth/me`, with the cars it has rented.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: user::Model,
    pub booked_cars: Vec<car::Model>,
}

fn validate_registration(payload: &RegisterRequest) -> AppResult<()> {
    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("Please add a name".to_string()));
    }
    if payload.telephone_number.trim().is_empty() {
        return Err(AppError::BadRequest("Please add a telephone number".to_string()));
    }
    let email = payload.email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => return Err(AppError::BadRequest("Please add a valid email".to_string())),
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if payload.role == Some(UserRole::Admin) {
        return Err(AppError::Forbidden(
            "Admin accounts cannot be self-registered".to_string(),
        ));
    }
    Ok(())
}

pub async fn register(db: &DatabaseConnection, payload: RegisterRequest) -> AppResult<user::Model> {
    validate_registration(&payload)?;
    let email = payload.email.trim().to_lowercase();

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(db)
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let new_user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        telephone_number: Set(payload.telephone_number.trim().to_string()),
        email: Set(email),
        password_hash: Set(hash_password(&payload.password)?),
        role: Set(payload.role.unwrap_or_default()),
        image: Set(None),
        my_rcp_id: Set(None),
        created_at: Set(Utc::now().into()),
    };

    // The unique index still guards against a concurrent registration.
    new_user.insert(db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("Email already registered".to_string())
        }
        _ => AppError::Database(e),
    })
}

/// Wrong email and wrong password are reported identically.
pub async fn login(db: &DatabaseConnection, email: &str, password: &str) -> AppResult<user::Model> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "Please provide an email and password".to_string(),
        ));
    }

    let user = user::Entity::find()
        .filter(user::Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await?
        .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !verify_password(password, &user.password_hash)? {
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    Ok(user)
}

/// Verifies the token and loads the account it names.
pub async fn resolve_session(
    db: &DatabaseConnection,
    token: &str,
    secret: &str,
) -> AppResult<AuthContext> {
    let claims = verify_token(token, secret)?;

    let user = user::Entity::find_by_id(claims.sub)
        .one(db)
        .await?
        .ok_or_else(|| {
            AppError::Unauthorized("Not authorized to access this route".to_string())
        })?;

    Ok(AuthContext::new(user))
}

pub async fn profile(db: &DatabaseConnection, user: user::Model) -> AppResult<UserProfile> {
    let booked_cars = car::Entity::find()
        .join_rev(JoinType::InnerJoin, booked_car::Relation::Car.def())
        .filter(booked_car::Column::UserId.eq(user.id))
        .order_by_desc(booked_car::Column::CreatedAt)
        .all(db)
        .await?;

    Ok(UserProfile { user, booked_cars })
}

pub async fn upload_profile(
    db: &DatabaseConnection,
    actor: &AuthContext,
    image: String,
) -> AppResult<user::Model> {
    if image.trim().is_empty() {
        return Err(AppError::BadRequest("Please provide an image".to_string()));
    }

    let mut active: user::ActiveModel = actor.user.clone().into();
    active.image = Set(Some(image.trim().to_string()));
    Ok(active.update(db).await?)
}

pub async fn list_users(db: &DatabaseConnection) -> AppResult<Vec<user::Model>> {
    Ok(user::Entity::find()
        .order_by_desc(user::Column::CreatedAt)
        .all(db)
        .await?)
}
