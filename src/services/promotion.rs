use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{find_provider, populate_providers, provider_owned_by};
use crate::entities::user::UserRole;
use crate::entities::{promotion, rental_car_provider};
use crate::error::{AppError, AppResult};
use crate::policy::{can_manage_promotion, AuthContext};
use crate::utils::query::{fetch_list, ListPage, ListQuery};

/// Body of both create and update; create requires every non-optional field.
#[derive(Debug, Default, Deserialize)]
pub struct PromotionRequest {
    pub provider: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "discountPercentage")]
    pub discount_percentage: Option<f64>,
    #[serde(alias = "maxDiscountAmount")]
    pub max_discount_amount: Option<f64>,
    #[serde(alias = "minPurchaseAmount")]
    pub min_purchase_amount: Option<f64>,
    pub amount: Option<i32>,
    #[serde(alias = "startDate")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(alias = "endDate")]
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct PromotionDetail {
    #[serde(flatten)]
    pub promotion: promotion::Model,
    pub provider: Option<rental_car_provider::Model>,
}

/// Field values after validation.
#[derive(Debug, Clone, PartialEq)]
struct PromotionTerms {
    discount_percentage: f64,
    max_discount_amount: f64,
    min_purchase_amount: f64,
    amount: i32,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
}

impl PromotionTerms {
    fn validate(&self) -> AppResult<()> {
        if !(self.discount_percentage > 0.0 && self.discount_percentage <= 100.0) {
            return Err(AppError::Unprocessable(
                "Discount percentage must be greater than 0 and at most 100".to_string(),
            ));
        }
        if !(self.max_discount_amount > 0.0) {
            return Err(AppError::Unprocessable(
                "Maximum discount amount must be greater than 0".to_string(),
            ));
        }
        if !(self.min_purchase_amount >= 0.0) {
            return Err(AppError::Unprocessable(
                "Minimum purchase amount cannot be negative".to_string(),
            ));
        }
        if self.amount < 0 {
            return Err(AppError::Unprocessable(
                "Amount cannot be negative".to_string(),
            ));
        }
        if self.start_date >= self.end_date {
            return Err(AppError::Unprocessable(
                "Start date must be before end date".to_string(),
            ));
        }
        Ok(())
    }

    fn of(promotion: &promotion::Model) -> Self {
        Self {
            discount_percentage: promotion.discount_percentage,
            max_discount_amount: promotion.max_discount_amount,
            min_purchase_amount: promotion.min_purchase_amount,
            amount: promotion.amount,
            start_date: promotion.start_date.with_timezone(&Utc),
            end_date: promotion.end_date.with_timezone(&Utc),
        }
    }

    fn merged(mut self, payload: &PromotionRequest) -> Self {
        if let Some(v) = payload.discount_percentage {
            self.discount_percentage = v;
        }
        if let Some(v) = payload.max_discount_amount {
            self.max_discount_amount = v;
        }
        if let Some(v) = payload.min_purchase_amount {
            self.min_purchase_amount = v;
        }
        if let Some(v) = payload.amount {
            self.amount = v;
        }
        if let Some(v) = payload.start_date {
            self.start_date = v;
        }
        if let Some(v) = payload.end_date {
            self.end_date = v;
        }
        self
    }
}

fn missing(field: &str) -> AppError {
    AppError::BadRequest(format!("Please add a {}", field))
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("No promotion with the id of {}", id))
}

async fn find_promotion(db: &DatabaseConnection, id: Uuid) -> AppResult<promotion::Model> {
    promotion::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| not_found(id))
}

/// The provider id a new promotion is scoped to.
///
/// Provider accounts are pinned to their own record; admins may name any
/// existing provider or none for a marketplace-wide promotion.
async fn resolve_owner(
    db: &DatabaseConnection,
    actor: &AuthContext,
    requested: Option<Uuid>,
) -> AppResult<Option<Uuid>> {
    match actor.role() {
        UserRole::Provider => {
            let own = provider_owned_by(db, actor.id()).await?.ok_or_else(|| {
                AppError::NotFound(format!(
                    "No rental car provider registered by user {}",
                    actor.id()
                ))
            })?;
            if requested.is_some_and(|p| p != own.id) {
                return Err(AppError::Forbidden(format!(
                    "User {} is not authorized to add a promotion to this rental car provider",
                    actor.id()
                )));
            }
            Ok(Some(own.id))
        }
        UserRole::Admin => match requested {
            Some(provider_id) => Ok(Some(find_provider(db, provider_id).await?.id)),
            None => Ok(None),
        },
        UserRole::User => Err(AppError::Forbidden(format!(
            "User {} is not authorized to manage promotions",
            actor.id()
        ))),
    }
}

async fn own_provider_id(db: &DatabaseConnection, actor: &AuthContext) -> AppResult<Option<Uuid>> {
    if actor.role() != UserRole::Provider {
        return Ok(None);
    }
    Ok(provider_owned_by(db, actor.id()).await?.map(|p| p.id))
}

pub async fn create(
    db: &DatabaseConnection,
    actor: &AuthContext,
    payload: PromotionRequest,
) -> AppResult<promotion::Model> {
    let title = payload
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| missing("title"))?
        .to_string();

    let terms = PromotionTerms {
        discount_percentage: payload
            .discount_percentage
            .ok_or_else(|| missing("discount percentage"))?,
        max_discount_amount: payload
            .max_discount_amount
            .ok_or_else(|| missing("maximum discount amount"))?,
        min_purchase_amount: payload
            .min_purchase_amount
            .ok_or_else(|| missing("minimum purchase amount"))?,
        amount: payload.amount.ok_or_else(|| missing("amount"))?,
        start_date: payload.start_date.ok_or_else(|| missing("start date"))?,
        end_date: payload.end_date.ok_or_else(|| missing("end date"))?,
    };
    terms.validate()?;

    let provider_id = resolve_owner(db, actor, payload.provider).await?;

    let new_promotion = promotion::ActiveModel {
        id: Set(Uuid::new_v4()),
        provider_id: Set(provider_id),
        title: Set(title),
        description: Set(payload.description),
        discount_percentage: Set(terms.discount_percentage),
        max_discount_amount: Set(terms.max_discount_amount),
        min_purchase_amount: Set(terms.min_purchase_amount),
        amount: Set(terms.amount),
        start_date: Set(terms.start_date.into()),
        end_date: Set(terms.end_date.into()),
        created_at: Set(Utc::now().into()),
    };

    let created = new_promotion.insert(db).await?;
    tracing::info!(promotion_id = %created.id, provider_id = ?created.provider_id, "Promotion created");
    Ok(created)
}

/// All promotions, or those of `provider_id`, with the provider embedded.
pub async fn list(
    db: &DatabaseConnection,
    query: &ListQuery,
    provider_id: Option<Uuid>,
) -> AppResult<ListPage> {
    let mut base = promotion::Entity::find();
    if let Some(provider_id) = provider_id {
        find_provider(db, provider_id).await?;
        base = base.filter(promotion::Column::ProviderId.eq(provider_id));
    }

    let mut page = fetch_list(db, base, query, promotion::Column::CreatedAt).await?;
    populate_providers(db, &mut page.items).await?;
    Ok(page)
}

pub async fn get(db: &DatabaseConnection, id: Uuid) -> AppResult<PromotionDetail> {
    let (promotion, provider) = promotion::Entity::find_by_id(id)
        .find_also_related(rental_car_provider::Entity)
        .one(db)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(PromotionDetail {
        promotion,
        provider,
    })
}

pub async fn update(
    db: &DatabaseConnection,
    actor: &AuthContext,
    id: Uuid,
    payload: PromotionRequest,
) -> AppResult<promotion::Model> {
    let promotion = find_promotion(db, id).await?;
    let own = own_provider_id(db, actor).await?;
    can_manage_promotion(actor, &promotion, own, "update this promotion").into_result()?;

    let terms = PromotionTerms::of(&promotion).merged(&payload);
    terms.validate()?;

    let provider_id = match payload.provider {
        Some(requested) if Some(requested) != promotion.provider_id => {
            Some(resolve_owner(db, actor, Some(requested)).await?)
        }
        _ => None,
    };

    let mut active: promotion::ActiveModel = promotion.into();
    if let Some(provider_id) = provider_id {
        active.provider_id = Set(provider_id);
    }
    if let Some(title) = payload.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(missing("title"));
        }
        active.title = Set(title);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    active.discount_percentage = Set(terms.discount_percentage);
    active.max_discount_amount = Set(terms.max_discount_amount);
    active.min_purchase_amount = Set(terms.min_purchase_amount);
    active.amount = Set(terms.amount);
    active.start_date = Set(terms.start_date.into());
    active.end_date = Set(terms.end_date.into());

    Ok(active.update(db).await?)
}

pub async fn delete(db: &DatabaseConnection, actor: &AuthContext, id: Uuid) -> AppResult<()> {
    let promotion = find_promotion(db, id).await?;
    let own = own_provider_id(db, actor).await?;
    can_manage_promotion(actor, &promotion, own, "delete this promotion").into_result()?;

    promotion::Entity::delete_by_id(promotion.id).exec(db).await?;
    Ok(())
}
