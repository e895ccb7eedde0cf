//! Schema migrations for the SQL code store.

use sea_orm_migration::prelude::*;

mod m20240101_000001_create_deeplink_codes_table;

/// Runs every migration this crate ships.
///
/// ```no_run
/// use deeplink_exchange::migration::Migrator;
/// use sea_orm::Database;
/// use sea_orm_migration::MigratorTrait;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let conn = Database::connect("sqlite::memory:").await?;
/// Migrator::up(&conn, None).await?;
/// # Ok(())
/// # }
/// ```
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    // Own bookkeeping table so we can share a database with other migrators.
    fn migration_table_name() -> sea_orm::DynIden {
        Alias::new("deeplink_exchange_migrations").into_iden()
    }

    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(
            m20240101_000001_create_deeplink_codes_table::Migration,
        )]
    }
}
