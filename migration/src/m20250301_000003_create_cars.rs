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
                    .table(Car::Table)
                    .if_not_exists()
                    .col(uuid(Car::Id).primary_key())
                    .col(uuid(Car::ProviderId).not_null())
                    .col(string_len(Car::Brand, 100).not_null())
                    .col(string_len(Car::Model, 100).not_null())
                    .col(string_len(Car::CarType, 16).not_null())
                    .col(string_len(Car::FuelType, 16).not_null())
                    .col(integer(Car::SeatingCapacity).not_null())
                    .col(integer(Car::Year).not_null())
                    .col(double(Car::PricePerDay).not_null())
                    .col(text_null(Car::CarDescription))
                    .col(string_null(Car::Image))
                    .col(
                        timestamp_with_time_zone(Car::PostedDate)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_car_provider")
                            .from(Car::Table, Car::ProviderId)
                            .to(RentalCarProvider::Table, RentalCarProvider::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_car_provider")
                    .table(Car::Table)
                    .col(Car::ProviderId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Car::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Car {
    Table,
    Id,
    ProviderId,
    Brand,
    Model,
    CarType,
    FuelType,
    SeatingCapacity,
    Year,
    PricePerDay,
    CarDescription,
    Image,
    PostedDate,
}
