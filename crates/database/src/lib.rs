//! Whisperwall Database Crate
//!
//! This crate provides database functionality for the Whisperwall application,
//! including connection management, migrations, and repository implementations.
//! Accounts own their anonymous message lists as an embedded JSON array column;
//! messages have no identity outside the owning account row.

use sqlx::SqlitePool;
use whisperwall_config::DatabaseConfig;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use migrations::run_migrations;

pub use repos::{AccountRepository, MessageRepository};

pub use entities::{
    account::{Account, CreateAccountRequest},
    message::Message,
};

pub use types::{errors::AccountError, AccountResult};

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> AccountResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

    run_migrations(&pool)
        .await
        .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

    Ok(pool)
}
