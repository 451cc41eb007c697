use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000002_create_rental_car_providers::RentalCarProvider;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Promotion::Table)
                    .if_not_exists()
                    .col(uuid(Promotion::Id).primary_key())
                    // NULL for marketplace-wide promotions
                    .col(uuid_null(Promotion::ProviderId))
                    .col(string_len(Promotion::Title, 100).not_null())
                    .col(text_null(Promotion::Description))
                    .col(double(Promotion::DiscountPercentage).not_null())
                    .col(double(Promotion::MaxDiscountAmount).not_null())
                    .col(double(Promotion::MinPurchaseAmount).not_null().default(0.0))
                    .col(integer(Promotion::Amount).not_null())
                    .col(timestamp_with_time_zone(Promotion::StartDate).not_null())
                    .col(timestamp_with_time_zone(Promotion::EndDate).not_null())
                    .col(
                        timestamp_with_time_zone(Promotion::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_promotion_provider")
                            .from(Promotion::Table, Promotion::ProviderId)
                            .to(RentalCarProvider::Table, RentalCarProvider::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Promotion::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Promotion {
    Table,
    Id,
    ProviderId,
    Title,
    Description,
    DiscountPercentage,
    MaxDiscountAmount,
    MinPurchaseAmount,
    Amount,
    StartDate,
    EndDate,
    CreatedAt,
}
