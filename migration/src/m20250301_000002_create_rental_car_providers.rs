use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_users::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RentalCarProvider::Table)
                    .if_not_exists()
                    .col(uuid(RentalCarProvider::Id).primary_key())
                    .col(uuid(RentalCarProvider::UserId).not_null().unique_key())
                    .col(string_len(RentalCarProvider::Name, 100).not_null())
                    .col(string(RentalCarProvider::Address).not_null())
                    .col(string_len(RentalCarProvider::District, 100).not_null())
                    .col(string_len(RentalCarProvider::Province, 100).not_null())
                    .col(string_len(RentalCarProvider::PostalCode, 10).not_null())
                    .col(string_len_null(RentalCarProvider::Tel, 32))
                    .col(string_len(RentalCarProvider::Region, 100).not_null())
                    .col(
                        timestamp_with_time_zone(RentalCarProvider::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rental_car_provider_user")
                            .from(RentalCarProvider::Table, RentalCarProvider::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RentalCarProvider::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum RentalCarProvider {
    Table,
    Id,
    UserId,
    Name,
    Address,
    District,
    Province,
    PostalCode,
    Tel,
    Region,
    CreatedAt,
}
