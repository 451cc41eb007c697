use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "promotion")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// `None` for a marketplace-wide promotion.
    pub provider_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub discount_percentage: f64,
    pub max_discount_amount: f64,
    pub min_purchase_amount: f64,
    /// Remaining redemptions.
    pub amount: i32,
    pub start_date: DateTimeWithTimeZone,
    pub end_date: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rental_car_provider::Entity",
        from = "Column::ProviderId",
        to = "super::rental_car_provider::Column::Id"
    )]
    Provider,
}

impl Related<super::rental_car_provider::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Provider.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
