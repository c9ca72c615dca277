//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_stations;
mod m20250101_000002_create_evses;
mod m20250101_000003_create_connectors;
mod m20250101_000004_create_transactions;
mod m20250101_000005_create_meter_values;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_stations::Migration),
            Box::new(m20250101_000002_create_evses::Migration),
            Box::new(m20250101_000003_create_connectors::Migration),
            Box::new(m20250101_000004_create_transactions::Migration),
            Box::new(m20250101_000005_create_meter_values::Migration),
        ]
    }
}
