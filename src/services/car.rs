use chrono::{Datelike, Utc};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Iterable,
    QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{find_provider, populate_providers};
use crate::entities::car::{CarType, FuelType};
use crate::entities::{booked_car, booking, car, comment, rental_car_provider};
use crate::error::{AppError, AppResult};
use crate::policy::{can_manage_car, AuthContext};
use crate::utils::query::{fetch_list, ListPage, ListQuery};

const OLDEST_MODEL_YEAR: i32 = 1900;

#[derive(Debug, Deserialize)]
pub struct CreateCarRequest {
    pub brand: String,
    pub model: String,
    #[serde(alias = "type")]
    pub car_type: String,
    #[serde(alias = "fuelType")]
    pub fuel_type: String,
    #[serde(alias = "seatingCapacity")]
    pub seating_capacity: i32,
    pub year: i32,
    #[serde(alias = "pricePerDay")]
    pub price_per_day: f64,
    #[serde(alias = "carDescription")]
    pub car_description: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCarRequest {
    pub brand: Option<String>,
    pub model: Option<String>,
    #[serde(alias = "type")]
    pub car_type: Option<String>,
    #[serde(alias = "fuelType")]
    pub fuel_type: Option<String>,
    #[serde(alias = "seatingCapacity")]
    pub seating_capacity: Option<i32>,
    pub year: Option<i32>,
    #[serde(alias = "pricePerDay")]
    pub price_per_day: Option<f64>,
    #[serde(alias = "carDescription")]
    pub car_description: Option<String>,
    pub image: Option<String>,
}

/// A car with its provider embedded.
#[derive(Debug, Serialize)]
pub struct CarDetail {
    #[serde(flatten)]
    pub car: car::Model,
    pub provider: Option<rental_car_provider::Model>,
}

fn parse_enum<E>(raw: &str, label: &str) -> AppResult<E>
where
    E: ActiveEnum<Value = String> + Iterable,
{
    let wanted = raw.trim().to_lowercase();
    E::iter().find(|v| v.to_value() == wanted).ok_or_else(|| {
        let allowed: Vec<String> = E::iter().map(|v| v.to_value()).collect();
        AppError::Unprocessable(format!(
            "{} must be one of: {}",
            label,
            allowed.join(", ")
        ))
    })
}

pub fn parse_car_type(raw: &str) -> AppResult<CarType> {
    parse_enum(raw, "Car type")
}

pub fn parse_fuel_type(raw: &str) -> AppResult<FuelType> {
    parse_enum(raw, "Fuel type")
}

fn non_empty(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("Please add a {}", field)));
    }
    Ok(trimmed.to_string())
}

fn check_seating(seating_capacity: i32) -> AppResult<i32> {
    if seating_capacity <= 0 {
        return Err(AppError::Unprocessable(
            "Seating capacity must be greater than 0".to_string(),
        ));
    }
    Ok(seating_capacity)
}

fn check_year(year: i32) -> AppResult<i32> {
    let latest = Utc::now().year() + 1;
    if !(OLDEST_MODEL_YEAR..=latest).contains(&year) {
        return Err(AppError::Unprocessable(format!(
            "Year must be between {} and {}",
            OLDEST_MODEL_YEAR, latest
        )));
    }
    Ok(year)
}

fn check_price(price_per_day: f64) -> AppResult<f64> {
    if !price_per_day.is_finite() || price_per_day <= 0.0 {
        return Err(AppError::Unprocessable(
            "Price per day must be greater than 0".to_string(),
        ));
    }
    Ok(price_per_day)
}

pub(crate) async fn find_car(db: &DatabaseConnection, id: Uuid) -> AppResult<car::Model> {
    car::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No car with the id of {}", id)))
}

async fn find_car_with_provider(
    db: &DatabaseConnection,
    id: Uuid,
) -> AppResult<(car::Model, rental_car_provider::Model)> {
    let (car, provider) = car::Entity::find_by_id(id)
        .find_also_related(rental_car_provider::Entity)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No car with the id of {}", id)))?;
    let provider = provider.ok_or_else(|| {
        AppError::Internal(format!("Car {} references a missing provider", id))
    })?;
    Ok((car, provider))
}

pub async fn create(
    db: &DatabaseConnection,
    actor: &AuthContext,
    provider_id: Uuid,
    payload: CreateCarRequest,
) -> AppResult<car::Model> {
    let provider = find_provider(db, provider_id).await?;
    can_manage_car(actor, &provider, "add a car to this rental car provider").into_result()?;

    let new_car = car::ActiveModel {
        id: Set(Uuid::new_v4()),
        provider_id: Set(provider.id),
        brand: Set(non_empty(&payload.brand, "brand")?),
        model: Set(non_empty(&payload.model, "model")?),
        car_type: Set(parse_car_type(&payload.car_type)?),
        fuel_type: Set(parse_fuel_type(&payload.fuel_type)?),
        seating_capacity: Set(check_seating(payload.seating_capacity)?),
        year: Set(check_year(payload.year)?),
        price_per_day: Set(check_price(payload.price_per_day)?),
        car_description: Set(payload.car_description),
        image: Set(payload.image),
        posted_date: Set(Utc::now().into()),
    };

    Ok(new_car.insert(db).await?)
}

/// All cars, or only those of `provider_id`, provider embedded in each item.
pub async fn list(
    db: &DatabaseConnection,
    query: &ListQuery,
    provider_id: Option<Uuid>,
) -> AppResult<ListPage> {
    let mut base = car::Entity::find();
    if let Some(provider_id) = provider_id {
        find_provider(db, provider_id).await?;
        base = base.filter(car::Column::ProviderId.eq(provider_id));
    }

    let mut page = fetch_list(db, base, query, car::Column::PostedDate).await?;
    populate_providers(db, &mut page.items).await?;
    Ok(page)
}

pub async fn get(db: &DatabaseConnection, id: Uuid) -> AppResult<CarDetail> {
    let (car, provider) = find_car_with_provider(db, id).await?;
    Ok(CarDetail {
        car,
        provider: Some(provider),
    })
}

pub async fn update(
    db: &DatabaseConnection,
    actor: &AuthContext,
    id: Uuid,
    payload: UpdateCarRequest,
) -> AppResult<car::Model> {
    let (car, provider) = find_car_with_provider(db, id).await?;
    can_manage_car(actor, &provider, "update this car").into_result()?;

    let mut active: car::ActiveModel = car.into();
    if let Some(brand) = payload.brand {
        active.brand = Set(non_empty(&brand, "brand")?);
    }
    if let Some(model) = payload.model {
        active.model = Set(non_empty(&model, "model")?);
    }
    if let Some(car_type) = payload.car_type {
        active.car_type = Set(parse_car_type(&car_type)?);
    }
    if let Some(fuel_type) = payload.fuel_type {
        active.fuel_type = Set(parse_fuel_type(&fuel_type)?);
    }
    if let Some(seating_capacity) = payload.seating_capacity {
        active.seating_capacity = Set(check_seating(seating_capacity)?);
    }
    if let Some(year) = payload.year {
        active.year = Set(check_year(year)?);
    }
    if let Some(price_per_day) = payload.price_per_day {
        active.price_per_day = Set(check_price(price_per_day)?);
    }
    if let Some(description) = payload.car_description {
        active.car_description = Set(Some(description));
    }
    if let Some(image) = payload.image {
        active.image = Set(Some(image));
    }

    Ok(active.update(db).await?)
}

/// Deletes the car with its comments, booked-car entries and bookings.
pub async fn delete(db: &DatabaseConnection, actor: &AuthContext, id: Uuid) -> AppResult<()> {
    let (car, provider) = find_car_with_provider(db, id).await?;
    can_manage_car(actor, &provider, "delete this car").into_result()?;

    let txn = db.begin().await?;

    let comments = comment::Entity::delete_many()
        .filter(comment::Column::CarId.eq(car.id))
        .exec(&txn)
        .await?
        .rows_affected;

    booked_car::Entity::delete_many()
        .filter(booked_car::Column::CarId.eq(car.id))
        .exec(&txn)
        .await?;

    let bookings = booking::Entity::delete_many()
        .filter(booking::Column::CarId.eq(car.id))
        .exec(&txn)
        .await?
        .rows_affected;

    car::Entity::delete_by_id(car.id).exec(&txn).await?;

    txn.commit().await?;

    tracing::info!(car_id = %car.id, comments, bookings, "Car deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_parsing_is_case_insensitive() {
        assert_eq!(parse_car_type("SUV").unwrap(), CarType::Suv);
        assert_eq!(parse_fuel_type(" electric ").unwrap(), FuelType::Electric);
    }

    #[test]
    fn test_unknown_enum_is_unprocessable() {
        match parse_car_type("hovercraft") {
            Err(AppError::Unprocessable(message)) => assert!(message.contains("sedan")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        assert!(matches!(parse_fuel_type("steam"), Err(AppError::Unprocessable(_))));
    }

    #[test]
    fn test_numeric_checks() {
        assert!(check_seating(0).is_err());
        assert!(check_year(1850).is_err());
        assert!(check_year(2020).is_ok());
        assert!(check_price(-1.0).is_err());
        assert!(check_price(f64::NAN).is_err());
    }
}
