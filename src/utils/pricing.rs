use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entities::promotion;
use crate::error::{AppError, AppResult};

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole rental days between two instants, rounded up, never less than one.
pub fn rental_days(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let seconds = (end - start).num_seconds();
    ((seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY).max(1)
}

pub fn base_price(price_per_day: f64, start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    price_per_day * rental_days(start, end) as f64
}

/// Checks that `promotion` can be redeemed against a booking of `subtotal` at `provider_id`.
pub fn check_promotion(
    promotion: &promotion::Model,
    provider_id: Uuid,
    subtotal: f64,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if promotion.provider_id.is_some_and(|p| p != provider_id) {
        return Err(AppError::BadRequest(
            "Promotion is not valid for this rental car provider".to_string(),
        ));
    }
    if now < promotion.start_date.with_timezone(&Utc) || now >= promotion.end_date.with_timezone(&Utc) {
        return Err(AppError::BadRequest("Promotion is not active".to_string()));
    }
    if promotion.amount <= 0 {
        return Err(AppError::BadRequest("Promotion has been fully redeemed".to_string()));
    }
    if subtotal < promotion.min_purchase_amount {
        return Err(AppError::BadRequest(format!(
            "Promotion requires a minimum purchase of {}",
            promotion.min_purchase_amount
        )));
    }
    Ok(())
}

/// Discount is a percentage of the subtotal, capped at `max_discount_amount`.
pub fn apply_discount(subtotal: f64, promotion: &promotion::Model) -> f64 {
    let discount = (subtotal * promotion.discount_percentage / 100.0).min(promotion.max_discount_amount);
    (subtotal - discount).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn promotion(pct: f64, cap: f64, min: f64) -> promotion::Model {
        let now = Utc::now();
        promotion::Model {
            id: Uuid::new_v4(),
            provider_id: None,
            title: "Launch".to_string(),
            description: None,
            discount_percentage: pct,
            max_discount_amount: cap,
            min_purchase_amount: min,
            amount: 5,
            start_date: (now - Duration::days(1)).into(),
            end_date: (now + Duration::days(1)).into(),
            created_at: now.into(),
        }
    }

    #[test]
    fn test_rental_days_round_up() {
        let start = Utc::now();
        assert_eq!(rental_days(start, start + Duration::hours(1)), 1);
        assert_eq!(rental_days(start, start + Duration::days(2)), 2);
        assert_eq!(rental_days(start, start + Duration::days(2) + Duration::hours(3)), 3);
    }

    #[test]
    fn test_discount_is_capped_and_clamped() {
        assert_eq!(apply_discount(1000.0, &promotion(10.0, 500.0, 0.0)), 900.0);
        assert_eq!(apply_discount(1000.0, &promotion(50.0, 100.0, 0.0)), 900.0);
        assert_eq!(apply_discount(50.0, &promotion(100.0, 500.0, 0.0)), 0.0);
    }

    #[test]
    fn test_promotion_eligibility() {
        let now = Utc::now();
        let provider = Uuid::new_v4();
        let global = promotion(10.0, 100.0, 200.0);
        assert!(check_promotion(&global, provider, 300.0, now).is_ok());
        assert!(check_promotion(&global, provider, 100.0, now).is_err());

        let mut scoped = promotion(10.0, 100.0, 0.0);
        scoped.provider_id = Some(Uuid::new_v4());
        assert!(check_promotion(&scoped, provider, 300.0, now).is_err());

        let mut exhausted = promotion(10.0, 100.0, 0.0);
        exhausted.amount = 0;
        assert!(check_promotion(&exhausted, provider, 300.0, now).is_err());

        assert!(check_promotion(&global, provider, 300.0, now + Duration::days(2)).is_err());
    }
}
