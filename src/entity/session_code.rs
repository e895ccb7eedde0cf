//! Session code entity model for Sea-ORM database interaction.
//!
//! Maps to the `deeplink_codes` table created by [`crate::migration::Migrator`].

use sea_orm::entity::prelude::*;

/// Sea-ORM entity model representing one live (or not yet purged) code.
///
/// # Database Schema
///
/// | Column      | Type               | Description                              |
/// |-------------|--------------------|------------------------------------------|
/// | key         | TEXT (Primary Key) | Namespaced identifier, `deeplink:<id>`   |
/// | code        | TEXT               | Invite or pairing code                   |
/// | expiry_date | TIMESTAMPTZ        | Instant after which the row is not read  |
///
/// Rows past `expiry_date` are invisible to lookups and removed by
/// [`crate::store::SeaOrmStore::delete_expired`].
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "deeplink_codes")]
pub struct Model {
    /// Namespaced key, e.g. `session:s1`.
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub key: String,

    #[sea_orm(column_type = "Text")]
    pub code: String,

    pub expiry_date: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
