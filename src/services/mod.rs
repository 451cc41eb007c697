//! Business rules for each resource, independent of the HTTP layer.
//!
//! Every operation takes the database handle and, where it mutates or reads
//! ownership-scoped data, the caller's [`AuthContext`](crate::policy::AuthContext).

pub mod booking;
pub mod car;
pub mod comment;
pub mod identity;
pub mod image;
pub mod payment;
pub mod promotion;
pub mod provider;

use std::collections::HashMap;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::entities::rental_car_provider;
use crate::error::{AppError, AppResult};

fn json_uuid(item: &serde_json::Value, key: &str) -> Option<Uuid> {
    item.get(key)?.as_str()?.parse().ok()
}

/// Embeds the referenced provider record as `provider` in each listed item.
pub(crate) async fn populate_providers(
    db: &DatabaseConnection,
    items: &mut [serde_json::Value],
) -> AppResult<()> {
    let ids: Vec<Uuid> = items
        .iter()
        .filter_map(|item| json_uuid(item, "provider_id"))
        .collect();
    if ids.is_empty() {
        return Ok(());
    }

    let providers: HashMap<Uuid, rental_car_provider::Model> = rental_car_provider::Entity::find()
        .filter(rental_car_provider::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    for item in items.iter_mut() {
        let Some(provider) = json_uuid(item, "provider_id").and_then(|id| providers.get(&id)) else {
            continue;
        };
        let value = serde_json::to_value(provider)
            .map_err(|e| AppError::Internal(format!("Failed to serialize provider: {}", e)))?;
        if let Some(object) = item.as_object_mut() {
            object.insert("provider".to_string(), value);
        }
    }

    Ok(())
}

pub(crate) async fn find_provider(
    db: &DatabaseConnection,
    id: Uuid,
) -> AppResult<rental_car_provider::Model> {
    rental_car_provider::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No rental car provider with the id of {}", id)))
}

/// The provider record owned by `user_id`, if any.
pub(crate) async fn provider_owned_by(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> AppResult<Option<rental_car_provider::Model>> {
    Ok(rental_car_provider::Entity::find()
        .filter(rental_car_provider::Column::UserId.eq(user_id))
        .one(db)
        .await?)
}
