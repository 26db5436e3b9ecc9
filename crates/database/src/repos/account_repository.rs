//! Account repository for database operations.

use crate::entities::account::{parse_message_list, Account, CreateAccountRequest};
use crate::types::{AccountError, AccountResult};
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, verify_code, verify_code_expiry, is_verified, is_accepting_messages, messages, created_at";

/// Repository for account rows and their embedded message lists.
#[derive(Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find an account by its internal identifier
    pub async fn find_by_id(&self, id: i64) -> AccountResult<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

        row.map(|row| account_from_row(&row)).transpose()
    }

    /// Find an account by username
    pub async fn find_by_username(&self, username: &str) -> AccountResult<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

        row.map(|row| account_from_row(&row)).transpose()
    }

    /// Find an account by email
    pub async fn find_by_email(&self, email: &str) -> AccountResult<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

        row.map(|row| account_from_row(&row)).transpose()
    }

    /// Create a new unverified account with an empty message list
    pub async fn create(&self, request: &CreateAccountRequest) -> AccountResult<Account> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO accounts (username, email, password_hash, verify_code, verify_code_expiry, is_verified, is_accepting_messages, messages, created_at) VALUES (?, ?, ?, ?, ?, false, true, '[]', ?)"
        )
        .bind(&request.username)
        .bind(&request.email)
        .bind(&request.password_hash)
        .bind(&request.verify_code)
        .bind(&request.verify_code_expiry)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                if e.to_string().contains("email") {
                    AccountError::EmailTaken
                } else {
                    AccountError::UsernameTaken
                }
            } else {
                AccountError::DatabaseError(e.to_string())
            }
        })?;

        self.find_by_username(&request.username)
            .await?
            .ok_or_else(|| {
                AccountError::DatabaseError("failed to retrieve created account".to_string())
            })
    }

    /// Replace the credentials and verification code of an unverified account.
    /// Used when a sign-up reuses an email whose verification never completed.
    pub async fn refresh_unverified_credentials(
        &self,
        email: &str,
        password_hash: &str,
        verify_code: &str,
        verify_code_expiry: &str,
    ) -> AccountResult<()> {
        let result = sqlx::query(
            "UPDATE accounts SET password_hash = ?, verify_code = ?, verify_code_expiry = ? WHERE email = ? AND is_verified = false",
        )
        .bind(password_hash)
        .bind(verify_code)
        .bind(verify_code_expiry)
        .bind(email)
        .execute(&self.pool)
        .await
        .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AccountError::NotFound);
        }

        Ok(())
    }

    /// Flip the verified flag. Idempotent: verifying an already-verified
    /// account succeeds.
    pub async fn mark_verified(&self, id: i64) -> AccountResult<()> {
        let result = sqlx::query("UPDATE accounts SET is_verified = true WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AccountError::NotFound);
        }

        Ok(())
    }

    /// Set the acceptance flag unconditionally; last writer wins.
    pub async fn set_accepting(&self, id: i64, accepting: bool) -> AccountResult<bool> {
        let result = sqlx::query("UPDATE accounts SET is_accepting_messages = ? WHERE id = ?")
            .bind(accepting)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AccountError::NotFound);
        }

        Ok(accepting)
    }

    /// Check whether a verified account already holds this username.
    /// Unverified holders do not count: their sign-up may still be reclaimed.
    pub async fn is_verified_username_taken(&self, username: &str) -> AccountResult<bool> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM accounts WHERE username = ? AND is_verified = true",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

        Ok(count.unwrap_or(0) > 0)
    }
}

fn account_from_row(row: &SqliteRow) -> AccountResult<Account> {
    let raw_messages: String = row
        .try_get("messages")
        .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

    Ok(Account {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        verify_code: row.get("verify_code"),
        verify_code_expiry: row.get("verify_code_expiry"),
        is_verified: row.get("is_verified"),
        is_accepting_messages: row.get("is_accepting_messages"),
        messages: parse_message_list(&raw_messages)?,
        created_at: row.get("created_at"),
    })
}
