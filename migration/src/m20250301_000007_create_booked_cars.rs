use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_users::User;
use super::m20250301_000003_create_cars::Car;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BookedCar::Table)
                    .if_not_exists()
                    .col(uuid(BookedCar::UserId).not_null())
                    .col(uuid(BookedCar::CarId).not_null())
                    .col(
                        timestamp_with_time_zone(BookedCar::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(BookedCar::UserId)
                            .col(BookedCar::CarId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booked_car_user")
                            .from(BookedCar::Table, BookedCar::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_booked_car_car")
                            .from(BookedCar::Table, BookedCar::CarId)
                            .to(Car::Table, Car::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BookedCar::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum BookedCar {
    Table,
    UserId,
    CarId,
    CreatedAt,
}
