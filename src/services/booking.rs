use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DbBackend, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::car::find_car;
use super::identity::{profile, UserProfile};
use super::{find_provider, provider_owned_by};
use crate::entities::booking::BookingStatus;
use crate::entities::user::UserRole;
use crate::entities::{booked_car, booking, car, promotion, rental_car_provider, user};
use crate::error::{AppError, AppResult};
use crate::policy::{booking_scope, can_access_booking, can_book_with, can_finish_booking, AuthContext};
use crate::utils::pricing::{apply_discount, base_price, check_promotion};

/// Maximum open bookings a regular user may hold at once.
pub const BOOKING_QUOTA: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingTarget {
    Provider(Uuid),
    Car(Uuid),
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub car: Option<Uuid>,
    #[serde(alias = "startDate")]
    pub start_date: DateTime<Utc>,
    #[serde(alias = "endDate")]
    pub end_date: DateTime<Utc>,
    pub promotion: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateBookingRequest {
    #[serde(alias = "startDate")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(alias = "endDate")]
    pub end_date: Option<DateTime<Utc>>,
    pub status: Option<BookingStatus>,
}

/// A booking with its provider and car embedded.
#[derive(Debug, Serialize)]
pub struct BookingDetail {
    #[serde(flatten)]
    pub booking: booking::Model,
    pub rental_car_provider: Option<rental_car_provider::Model>,
    pub car: Option<car::Model>,
}

/// `end` must follow `start`; when `check_start` is set `start` may not be in the past.
pub fn validate_dates(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    check_start: bool,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if end <= start {
        return Err(AppError::Unprocessable(
            "Start date must be before end date".to_string(),
        ));
    }
    if check_start && start < now {
        return Err(AppError::Unprocessable(
            "Start date cannot be in the past".to_string(),
        ));
    }
    Ok(())
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("No booking with the id of {}", id))
}

async fn find_booking(db: &DatabaseConnection, id: Uuid) -> AppResult<booking::Model> {
    booking::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| not_found(id))
}

/// Takes one unit of `promotion_id`'s stock in a single conditional update.
pub async fn redeem_promotion<C: ConnectionTrait>(conn: &C, promotion_id: Uuid) -> AppResult<()> {
    let redeemed = promotion::Entity::update_many()
        .col_expr(
            promotion::Column::Amount,
            Expr::col(promotion::Column::Amount).sub(1),
        )
        .filter(promotion::Column::Id.eq(promotion_id))
        .filter(promotion::Column::Amount.gt(0))
        .exec(conn)
        .await?;

    if redeemed.rows_affected == 0 {
        return Err(AppError::BadRequest(
            "Promotion has been fully redeemed".to_string(),
        ));
    }
    Ok(())
}

/// Counts the user's open bookings then inserts, inside one transaction.
///
/// On PostgreSQL the user row is locked `FOR UPDATE` first so concurrent
/// requests from the same account serialize on the quota check.
async fn insert_within_quota(
    db: &DatabaseConnection,
    actor: &AuthContext,
    new_booking: booking::ActiveModel,
    promotion_id: Option<Uuid>,
) -> AppResult<booking::Model> {
    let txn = db.begin().await?;

    if actor.role() == UserRole::User {
        let mut lock = user::Entity::find_by_id(actor.id());
        if txn.get_database_backend() == DbBackend::Postgres {
            lock = lock.lock_exclusive();
        }
        lock.one(&txn).await?;

        let open = booking::Entity::find()
            .filter(booking::Column::UserId.eq(actor.id()))
            .filter(booking::Column::Status.is_in(BookingStatus::open()))
            .count(&txn)
            .await?;

        if open >= BOOKING_QUOTA {
            tracing::info!(user_id = %actor.id(), open, "Booking refused, quota reached");
            return Err(AppError::Conflict(format!(
                "The user with ID {} has already made {} bookings",
                actor.id(),
                BOOKING_QUOTA
            )));
        }
    }

    let created = new_booking.insert(&txn).await?;

    if let Some(promotion_id) = promotion_id {
        redeem_promotion(&txn, promotion_id).await?;
    }

    txn.commit().await?;
    Ok(created)
}

pub async fn create(
    db: &DatabaseConnection,
    actor: &AuthContext,
    target: BookingTarget,
    payload: CreateBookingRequest,
) -> AppResult<booking::Model> {
    let now = Utc::now();
    validate_dates(payload.start_date, payload.end_date, true, now)?;

    let (provider, car) = match target {
        BookingTarget::Car(car_id) => {
            let car = find_car(db, car_id).await?;
            (find_provider(db, car.provider_id).await?, Some(car))
        }
        BookingTarget::Provider(provider_id) => {
            let provider = find_provider(db, provider_id).await?;
            let car = match payload.car {
                Some(car_id) => {
                    let car = find_car(db, car_id).await?;
                    if car.provider_id != provider.id {
                        return Err(AppError::BadRequest(format!(
                            "Car {} does not belong to rental car provider {}",
                            car.id, provider.id
                        )));
                    }
                    Some(car)
                }
                None => None,
            };
            (provider, car)
        }
    };

    can_book_with(actor, &provider).into_result()?;

    let mut total_price = car
        .as_ref()
        .map(|c| base_price(c.price_per_day, payload.start_date, payload.end_date))
        .unwrap_or(0.0);

    if let Some(promotion_id) = payload.promotion {
        let promotion = promotion::Entity::find_by_id(promotion_id)
            .one(db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No promotion with the id of {}", promotion_id)))?;
        check_promotion(&promotion, provider.id, total_price, now)?;
        total_price = apply_discount(total_price, &promotion);
    }

    let new_booking = booking::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(actor.id()),
        rental_car_provider_id: Set(provider.id),
        car_id: Set(car.map(|c| c.id)),
        promotion_id: Set(payload.promotion),
        start_date: Set(payload.start_date.into()),
        end_date: Set(payload.end_date.into()),
        total_price: Set(total_price),
        status: Set(BookingStatus::Pending),
        created_at: Set(now.into()),
    };

    let created = insert_within_quota(db, actor, new_booking, payload.promotion).await?;
    tracing::info!(booking_id = %created.id, user_id = %actor.id(), "Booking created");
    Ok(created)
}

async fn attach_details(
    db: &DatabaseConnection,
    rows: Vec<(booking::Model, Option<rental_car_provider::Model>)>,
) -> AppResult<Vec<BookingDetail>> {
    let car_ids: Vec<Uuid> = rows.iter().filter_map(|(b, _)| b.car_id).collect();
    let cars: HashMap<Uuid, car::Model> = if car_ids.is_empty() {
        HashMap::new()
    } else {
        car::Entity::find()
            .filter(car::Column::Id.is_in(car_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect()
    };

    Ok(rows
        .into_iter()
        .map(|(booking, provider)| {
            let car = booking.car_id.and_then(|id| cars.get(&id).cloned());
            BookingDetail {
                booking,
                rental_car_provider: provider,
                car,
            }
        })
        .collect())
}

/// Bookings visible to `actor`, optionally narrowed to one provider.
pub async fn list(
    db: &DatabaseConnection,
    actor: &AuthContext,
    requested_provider: Option<Uuid>,
) -> AppResult<Vec<BookingDetail>> {
    let own_provider = if actor.role() == UserRole::Provider {
        provider_owned_by(db, actor.id()).await?.map(|p| p.id)
    } else {
        None
    };
    let scope = booking_scope(actor, own_provider, requested_provider)?;

    let mut query = booking::Entity::find();
    if let Some(user_id) = scope.user_id {
        query = query.filter(booking::Column::UserId.eq(user_id));
    }
    if let Some(provider_id) = scope.provider_id {
        query = query.filter(booking::Column::RentalCarProviderId.eq(provider_id));
    }

    let rows = query
        .find_also_related(rental_car_provider::Entity)
        .order_by_desc(booking::Column::CreatedAt)
        .all(db)
        .await?;

    attach_details(db, rows).await
}

pub async fn get(db: &DatabaseConnection, actor: &AuthContext, id: Uuid) -> AppResult<BookingDetail> {
    let (booking, provider) = booking::Entity::find_by_id(id)
        .find_also_related(rental_car_provider::Entity)
        .one(db)
        .await?
        .ok_or_else(|| not_found(id))?;

    can_access_booking(actor, &booking, provider.as_ref(), "view this booking").into_result()?;

    let mut details = attach_details(db, vec![(booking, provider)]).await?;
    details.pop().ok_or_else(|| not_found(id))
}

pub async fn update(
    db: &DatabaseConnection,
    actor: &AuthContext,
    id: Uuid,
    payload: UpdateBookingRequest,
) -> AppResult<booking::Model> {
    let booking = find_booking(db, id).await?;
    let provider = rental_car_provider::Entity::find_by_id(booking.rental_car_provider_id)
        .one(db)
        .await?;
    can_access_booking(actor, &booking, provider.as_ref(), "update this booking").into_result()?;

    if payload.status.is_some() && actor.role() == UserRole::User {
        return Err(AppError::Forbidden(format!(
            "User {} is not authorized to change the status of this booking",
            actor.id()
        )));
    }

    let start = payload
        .start_date
        .unwrap_or_else(|| booking.start_date.with_timezone(&Utc));
    let end = payload
        .end_date
        .unwrap_or_else(|| booking.end_date.with_timezone(&Utc));
    let dates_changed = payload.start_date.is_some() || payload.end_date.is_some();
    validate_dates(start, end, payload.start_date.is_some(), Utc::now())?;

    let mut total_price = booking.total_price;
    if dates_changed {
        if let Some(car_id) = booking.car_id {
            total_price = base_price(find_car(db, car_id).await?.price_per_day, start, end);
            if let Some(promotion_id) = booking.promotion_id {
                if let Some(promotion) = promotion::Entity::find_by_id(promotion_id).one(db).await? {
                    total_price = apply_discount(total_price, &promotion);
                }
            }
        }
    }

    let mut active: booking::ActiveModel = booking.into();
    active.start_date = Set(start.into());
    active.end_date = Set(end.into());
    active.total_price = Set(total_price);
    if let Some(status) = payload.status {
        active.status = Set(status);
    }

    Ok(active.update(db).await?)
}

pub async fn delete(db: &DatabaseConnection, actor: &AuthContext, id: Uuid) -> AppResult<()> {
    let booking = find_booking(db, id).await?;
    let provider = rental_car_provider::Entity::find_by_id(booking.rental_car_provider_id)
        .one(db)
        .await?;
    can_access_booking(actor, &booking, provider.as_ref(), "delete this booking").into_result()?;

    booking::Entity::delete_by_id(booking.id).exec(db).await?;
    Ok(())
}

/// Records the booking's car on its user (once) and removes the booking.
pub async fn finish(db: &DatabaseConnection, actor: &AuthContext, id: Uuid) -> AppResult<UserProfile> {
    let booking = find_booking(db, id).await?;
    can_finish_booking(actor, &booking).into_result()?;

    let car_id = booking.car_id.ok_or_else(|| {
        AppError::BadRequest(format!("Booking {} has no car to record", booking.id))
    })?;

    let txn = db.begin().await?;

    let existing = booked_car::Entity::find_by_id((booking.user_id, car_id))
        .one(&txn)
        .await?;
    if existing.is_none() {
        booked_car::ActiveModel {
            user_id: Set(booking.user_id),
            car_id: Set(car_id),
            created_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await?;
    }

    booking::Entity::delete_by_id(booking.id).exec(&txn).await?;
    txn.commit().await?;

    let owner = user::Entity::find_by_id(booking.user_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No user with the id of {}", booking.user_id)))?;

    tracing::info!(booking_id = %booking.id, user_id = %owner.id, car_id = %car_id, "Booking finished");
    profile(db, owner).await
}
