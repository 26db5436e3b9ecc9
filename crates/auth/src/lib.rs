use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use rand::{Rng, RngCore};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::{debug, info};
use whisperwall_config::AuthConfig;

#[derive(Clone)]
pub struct Authenticator {
    pool: SqlitePool,
    session_ttl: Duration,
    verify_code_ttl: Duration,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("username is already taken")]
    UsernameTaken,
    #[error("email is already registered")]
    EmailTaken,
    #[error("account not found")]
    AccountNotFound,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("account is not verified")]
    AccountNotVerified,
    #[error("verification code has expired")]
    CodeExpired,
    #[error("incorrect verification code")]
    InvalidCode,
    #[error("stored verification expiry is invalid")]
    InvalidExpiry,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] argon2::password_hash::Error),
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid session token")]
    InvalidSession,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    #[serde(skip_serializing)]
    pub id: i64,
    pub username: String,
    pub is_verified: bool,
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub account_id: i64,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of a registration. Carries the verification code so the caller
/// can hand it to a delivery channel.
#[derive(Debug, Clone)]
pub struct RegisteredAccount {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub verify_code: String,
    pub verify_code_expiry: DateTime<Utc>,
}

struct AccountRow {
    id: i64,
    username: String,
    password_hash: String,
    verify_code: String,
    verify_code_expiry: String,
    is_verified: bool,
}

impl Authenticator {
    pub fn new(pool: SqlitePool, config: AuthConfig) -> Self {
        let session_ttl = Duration::seconds(config.session_ttl_seconds as i64);
        let verify_code_ttl = Duration::seconds(config.verify_code_ttl_seconds as i64);

        Self {
            pool,
            session_ttl,
            verify_code_ttl,
        }
    }

    /// Register a new account, or refresh the credentials of an unverified
    /// one that re-registers with the same email.
    ///
    /// A username held by a verified account is taken for good. A username
    /// or email held only by an unverified account may still be reclaimed
    /// until its holder verifies.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisteredAccount, AuthError> {
        let verified_holder: Option<i64> =
            sqlx::query_scalar("SELECT id FROM accounts WHERE username = ? AND is_verified = true")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;
        if verified_holder.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = self.hash_password(password)?;
        let verify_code = generate_verify_code();
        let verify_code_expiry = Utc::now() + self.verify_code_ttl;

        let existing = sqlx::query("SELECT id, username, is_verified FROM accounts WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = existing {
            let is_verified: bool = row.try_get("is_verified")?;
            if is_verified {
                return Err(AuthError::EmailTaken);
            }

            // The earlier sign-up never completed; let the new attempt take
            // over the row with a fresh password and code.
            let id: i64 = row.try_get("id")?;
            let existing_username: String = row.try_get("username")?;

            sqlx::query(
                "UPDATE accounts SET password_hash = ?, verify_code = ?, verify_code_expiry = ? WHERE id = ?",
            )
            .bind(&password_hash)
            .bind(&verify_code)
            .bind(verify_code_expiry.to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?;

            info!(username = %existing_username, "refreshed unverified registration");
            return Ok(RegisteredAccount {
                id,
                username: existing_username,
                email: email.to_owned(),
                verify_code,
                verify_code_expiry,
            });
        }

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO accounts (username, email, password_hash, verify_code, verify_code_expiry, is_verified, is_accepting_messages, messages, created_at) VALUES (?, ?, ?, ?, ?, false, true, '[]', ?)",
        )
        .bind(username)
        .bind(email)
        .bind(&password_hash)
        .bind(&verify_code)
        .bind(verify_code_expiry.to_rfc3339())
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let message = e.to_string();
            if message.contains("UNIQUE constraint failed") {
                if message.contains("email") {
                    AuthError::EmailTaken
                } else {
                    AuthError::UsernameTaken
                }
            } else {
                AuthError::Database(e)
            }
        })?;

        let id = result.last_insert_rowid();
        info!(username, "registered new account");

        Ok(RegisteredAccount {
            id,
            username: username.to_owned(),
            email: email.to_owned(),
            verify_code,
            verify_code_expiry,
        })
    }

    /// Check a verification code against the account identified by username
    /// or, failing that, email.
    ///
    /// An expired code is reported as expired even when it also does not
    /// match; the caller needs a fresh code either way.
    pub async fn verify_account(&self, identifier: &str, code: &str) -> Result<AuthUser, AuthError> {
        let account = self
            .find_account(identifier)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        let expiry = DateTime::parse_from_rfc3339(&account.verify_code_expiry)
            .map_err(|_| AuthError::InvalidExpiry)?
            .with_timezone(&Utc);

        let code_matches = account.verify_code == code;
        let unexpired = Utc::now() < expiry;

        if code_matches && unexpired {
            sqlx::query("UPDATE accounts SET is_verified = true WHERE id = ?")
                .bind(account.id)
                .execute(&self.pool)
                .await?;

            info!(username = %account.username, "account verified");
            return Ok(AuthUser {
                id: account.id,
                username: account.username,
                is_verified: true,
            });
        }

        if !unexpired {
            return Err(AuthError::CodeExpired);
        }
        Err(AuthError::InvalidCode)
    }

    /// Authenticate by username or email plus password and issue a session.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<(AuthUser, AuthSession), AuthError> {
        let account = self
            .find_account(identifier)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let stored_hash = PasswordHash::new(&account.password_hash)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &stored_hash)
            .map_err(|_| AuthError::InvalidCredentials)?;

        if !account.is_verified {
            return Err(AuthError::AccountNotVerified);
        }

        let session = self.issue_session(account.id).await?;
        debug!(username = %account.username, "session issued");

        Ok((
            AuthUser {
                id: account.id,
                username: account.username,
                is_verified: true,
            },
            session,
        ))
    }

    pub async fn authenticate_token(
        &self,
        token: &str,
    ) -> Result<(AuthUser, AuthSession), AuthError> {
        let row = sqlx::query("SELECT account_id, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Err(AuthError::SessionNotFound);
        };

        let account_id: i64 = row.try_get("account_id")?;
        let expires_at: String = row.try_get("expires_at")?;

        let expires_at = DateTime::parse_from_rfc3339(&expires_at)
            .map_err(|_| AuthError::InvalidSession)?
            .with_timezone(&Utc);

        if expires_at <= Utc::now() {
            sqlx::query("DELETE FROM sessions WHERE token = ?")
                .bind(token)
                .execute(&self.pool)
                .await?;
            return Err(AuthError::SessionExpired);
        }

        let row = sqlx::query("SELECT username, is_verified FROM accounts WHERE id = ?")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        let user = AuthUser {
            id: account_id,
            username: row.try_get("username")?,
            is_verified: row.try_get("is_verified")?,
        };
        let session = AuthSession {
            token: token.to_owned(),
            account_id,
            expires_at,
        };

        Ok((user, session))
    }

    async fn find_account(&self, identifier: &str) -> Result<Option<AccountRow>, AuthError> {
        // Username first, then email, matching how people share handles.
        let row = sqlx::query(
            "SELECT id, username, password_hash, verify_code, verify_code_expiry, is_verified FROM accounts WHERE username = ?",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(row) => Some(row),
            None => {
                sqlx::query(
                    "SELECT id, username, password_hash, verify_code, verify_code_expiry, is_verified FROM accounts WHERE email = ?",
                )
                .bind(identifier)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        row.map(|row| {
            Ok(AccountRow {
                id: row.try_get("id")?,
                username: row.try_get("username")?,
                password_hash: row.try_get("password_hash")?,
                verify_code: row.try_get("verify_code")?,
                verify_code_expiry: row.try_get("verify_code_expiry")?,
                is_verified: row.try_get("is_verified")?,
            })
        })
        .transpose()
    }

    async fn issue_session(&self, account_id: i64) -> Result<AuthSession, AuthError> {
        let token = self.generate_session_token();
        let now = Utc::now();
        let expires_at = now + self.session_ttl;

        sqlx::query(
            "INSERT INTO sessions (account_id, token, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(account_id)
        .bind(&token)
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(AuthSession {
            token,
            account_id,
            expires_at,
        })
    }

    fn hash_password(&self, password: &str) -> Result<String, argon2::password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    fn generate_session_token(&self) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

fn generate_verify_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}
