//! recipe-sync - copy ingredient lists and tag memberships from JSON
//! recipe documents into the relational recipe database.

pub mod commands;
pub mod config;
pub mod documents;
pub mod error;
pub mod progress;
pub mod store;
pub mod sync;
