//! Database entity models for the SQL code store.
//!
//! The only entity is [`session_code`], one row per namespaced identifier.

/// Session code entity model for Sea-ORM database interaction.
pub mod session_code;
