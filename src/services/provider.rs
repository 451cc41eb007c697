use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    QueryFilter, QuerySelect, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{find_provider, provider_owned_by};
use crate::entities::user::UserRole;
use crate::entities::{booked_car, booking, car, comment, promotion, rental_car_provider, user};
use crate::error::{AppError, AppResult};
use crate::policy::{can_manage_provider, AuthContext};
use crate::utils::query::{fetch_list, ListPage, ListQuery};

#[derive(Debug, Deserialize)]
pub struct CreateProviderRequest {
    /// Only honoured for admins creating a record on behalf of a provider account.
    pub user: Option<Uuid>,
    pub name: String,
    pub address: String,
    pub district: String,
    pub province: String,
    #[serde(alias = "postalCode")]
    pub postal_code: String,
    pub tel: Option<String>,
    pub region: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProviderRequest {
    pub name: Option<String>,
    pub address: Option<String>,
    pub district: Option<String>,
    pub province: Option<String>,
    #[serde(alias = "postalCode")]
    pub postal_code: Option<String>,
    pub tel: Option<String>,
    pub region: Option<String>,
}

/// Rows removed by a provider cascade delete.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub cars: u64,
    pub comments: u64,
    pub bookings: u64,
    pub promotions: u64,
}

fn required(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("Please add a {}", field)));
    }
    Ok(trimmed.to_string())
}

fn already_registered(user_id: Uuid) -> AppError {
    AppError::Conflict(format!(
        "The user with ID {} has already registered a rental car provider",
        user_id
    ))
}

pub async fn create(
    db: &DatabaseConnection,
    actor: &AuthContext,
    payload: CreateProviderRequest,
) -> AppResult<rental_car_provider::Model> {
    let owner_id = match (actor.role(), payload.user) {
        (UserRole::Admin, Some(owner_id)) => {
            let owner = user::Entity::find_by_id(owner_id)
                .one(db)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("No user with the id of {}", owner_id)))?;
            if owner.role != UserRole::Provider {
                return Err(AppError::BadRequest(format!(
                    "User {} does not have the provider role",
                    owner_id
                )));
            }
            owner_id
        }
        _ => actor.id(),
    };

    if provider_owned_by(db, owner_id).await?.is_some() {
        return Err(already_registered(owner_id));
    }

    let new_provider = rental_car_provider::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(owner_id),
        name: Set(required(&payload.name, "name")?),
        address: Set(required(&payload.address, "address")?),
        district: Set(required(&payload.district, "district")?),
        province: Set(required(&payload.province, "province")?),
        postal_code: Set(required(&payload.postal_code, "postal code")?),
        tel: Set(payload.tel.filter(|t| !t.trim().is_empty())),
        region: Set(required(&payload.region, "region")?),
        created_at: Set(Utc::now().into()),
    };

    let txn = db.begin().await?;

    let provider = new_provider.insert(&txn).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => already_registered(owner_id),
        _ => AppError::Database(e),
    })?;

    user::Entity::update_many()
        .col_expr(user::Column::MyRcpId, Expr::value(Some(provider.id)))
        .filter(user::Column::Id.eq(owner_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(provider_id = %provider.id, user_id = %owner_id, "Rental car provider created");
    Ok(provider)
}

pub async fn list(db: &DatabaseConnection, query: &ListQuery) -> AppResult<ListPage> {
    fetch_list(
        db,
        rental_car_provider::Entity::find(),
        query,
        rental_car_provider::Column::CreatedAt,
    )
    .await
}

pub async fn get(db: &DatabaseConnection, id: Uuid) -> AppResult<rental_car_provider::Model> {
    find_provider(db, id).await
}

pub async fn update(
    db: &DatabaseConnection,
    actor: &AuthContext,
    id: Uuid,
    payload: UpdateProviderRequest,
) -> AppResult<rental_car_provider::Model> {
    let provider = find_provider(db, id).await?;
    can_manage_provider(actor, &provider, "update this rental car provider").into_result()?;

    let mut active: rental_car_provider::ActiveModel = provider.into();
    if let Some(name) = payload.name {
        active.name = Set(required(&name, "name")?);
    }
    if let Some(address) = payload.address {
        active.address = Set(required(&address, "address")?);
    }
    if let Some(district) = payload.district {
        active.district = Set(required(&district, "district")?);
    }
    if let Some(province) = payload.province {
        active.province = Set(required(&province, "province")?);
    }
    if let Some(postal_code) = payload.postal_code {
        active.postal_code = Set(required(&postal_code, "postal code")?);
    }
    if let Some(tel) = payload.tel {
        active.tel = Set(Some(tel.trim().to_string()).filter(|t| !t.is_empty()));
    }
    if let Some(region) = payload.region {
        active.region = Set(required(&region, "region")?);
    }

    Ok(active.update(db).await?)
}

pub async fn delete(db: &DatabaseConnection, actor: &AuthContext, id: Uuid) -> AppResult<CascadeReport> {
    let provider = find_provider(db, id).await?;
    can_manage_provider(actor, &provider, "delete this rental car provider").into_result()?;

    let report = cascade_delete(db, &provider).await?;
    tracing::info!(provider_id = %id, ?report, "Rental car provider deleted");
    Ok(report)
}

/// Removes a provider and everything that depends on it in one transaction.
///
/// Order: comments on its cars, booked-car entries for its cars, bookings
/// (by provider or by car), cars, promotions, the owner's back-link, and
/// finally the provider row. Any failure rolls the whole delete back.
pub async fn cascade_delete(
    db: &DatabaseConnection,
    provider: &rental_car_provider::Model,
) -> AppResult<CascadeReport> {
    let txn = db.begin().await?;

    let car_ids: Vec<Uuid> = car::Entity::find()
        .select_only()
        .column(car::Column::Id)
        .filter(car::Column::ProviderId.eq(provider.id))
        .into_tuple()
        .all(&txn)
        .await?;

    let comments = comment::Entity::delete_many()
        .filter(comment::Column::CarId.is_in(car_ids.clone()))
        .exec(&txn)
        .await?
        .rows_affected;

    booked_car::Entity::delete_many()
        .filter(booked_car::Column::CarId.is_in(car_ids.clone()))
        .exec(&txn)
        .await?;

    let bookings = booking::Entity::delete_many()
        .filter(
            Condition::any()
                .add(booking::Column::RentalCarProviderId.eq(provider.id))
                .add(booking::Column::CarId.is_in(car_ids)),
        )
        .exec(&txn)
        .await?
        .rows_affected;

    let cars = car::Entity::delete_many()
        .filter(car::Column::ProviderId.eq(provider.id))
        .exec(&txn)
        .await?
        .rows_affected;

    let promotions = promotion::Entity::delete_many()
        .filter(promotion::Column::ProviderId.eq(provider.id))
        .exec(&txn)
        .await?
        .rows_affected;

    user::Entity::update_many()
        .col_expr(user::Column::MyRcpId, Expr::value(Option::<Uuid>::None))
        .filter(user::Column::MyRcpId.eq(provider.id))
        .exec(&txn)
        .await?;

    rental_car_provider::Entity::delete_by_id(provider.id)
        .exec(&txn)
        .await?;

    txn.commit().await?;

    Ok(CascadeReport {
        cars,
        comments,
        bookings,
        promotions,
    })
}
