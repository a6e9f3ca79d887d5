pub use sea_orm_migration::prelude::*;

mod m20250301_000001_tenancy;
mod m20250301_000002_hr_core;
mod m20250301_000003_talent;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_tenancy::Migration),
            Box::new(m20250301_000002_hr_core::Migration),
            Box::new(m20250301_000003_talent::Migration),
        ]
    }
}
