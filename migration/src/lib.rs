pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_users;
mod m20250301_000002_create_rental_car_providers;
mod m20250301_000003_create_cars;
mod m20250301_000004_create_promotions;
mod m20250301_000005_create_bookings;
mod m20250301_000006_create_comments;
mod m20250301_000007_create_booked_cars;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users::Migration),
            Box::new(m20250301_000002_create_rental_car_providers::Migration),
            Box::new(m20250301_000003_create_cars::Migration),
            Box::new(m20250301_000004_create_promotions::Migration),
            Box::new(m20250301_000005_create_bookings::Migration),
            Box::new(m20250301_000006_create_comments::Migration),
            Box::new(m20250301_000007_create_booked_cars::Migration),
        ]
    }
}
