//! Database migrations for the storesync engine.
//!
//! Parent tables come before the child tables that reference them.

pub use sea_orm_migration::prelude::*;

mod m2025_11_10_090000_create_sync_state;
mod m2025_11_10_090100_create_users;
mod m2025_11_10_090200_create_products;
mod m2025_11_10_090300_create_orders;
mod m2025_11_10_090400_create_aftersales;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_11_10_090000_create_sync_state::Migration),
            Box::new(m2025_11_10_090100_create_users::Migration),
            Box::new(m2025_11_10_090200_create_products::Migration),
            Box::new(m2025_11_10_090300_create_orders::Migration),
            Box::new(m2025_11_10_090400_create_aftersales::Migration),
        ]
    }
}
