use std::collections::HashSet;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use tempfile::TempDir;
use whisperwall_auth::{AuthError, Authenticator};
use whisperwall_config::AuthConfig;

type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

fn default_auth_config() -> AuthConfig {
    AuthConfig {
        session_ttl_seconds: 3_600,
        verify_code_ttl_seconds: 600,
    }
}

struct TestContext {
    pool: SqlitePool,
    authenticator: Authenticator,
    _temp_dir: TempDir,
    config: AuthConfig,
}

impl TestContext {
    async fn new(config: AuthConfig) -> TestResult<Self> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("auth.sqlite");
        let db_url = format!("sqlite://{}", db_path.display());

        let mut options = SqliteConnectOptions::from_str(&db_url)?;
        options = options.create_if_missing(true);
        options = options.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        MIGRATOR.run(&pool).await?;

        let authenticator = Authenticator::new(pool.clone(), config.clone());

        Ok(Self {
            pool,
            authenticator,
            _temp_dir: temp_dir,
            config,
        })
    }

    async fn new_default() -> TestResult<Self> {
        Self::new(default_auth_config()).await
    }

    fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// Register and immediately verify an account.
    async fn register_verified(&self, username: &str, email: &str, password: &str) -> TestResult {
        let registered = self.authenticator.register(username, email, password).await?;
        self.authenticator
            .verify_account(username, &registered.verify_code)
            .await?;
        Ok(())
    }
}

#[tokio::test]
async fn register_persists_unverified_account_with_hashed_password() -> TestResult {
    let ctx = TestContext::new_default().await?;

    let registered = ctx
        .authenticator()
        .register("alice", "alice@example.com", "s3cret-pass")
        .await?;
    assert_eq!(registered.username, "alice");

    let row = sqlx::query_as::<_, (String, bool, bool)>(
        "SELECT password_hash, is_verified, is_accepting_messages FROM accounts WHERE id = ?",
    )
    .bind(registered.id)
    .fetch_one(ctx.pool())
    .await?;

    assert!(
        row.0.starts_with("$argon2"),
        "password must be stored as an argon2 hash"
    );
    assert!(!row.1, "fresh registrations start unverified");
    assert!(row.2, "fresh registrations accept messages");

    Ok(())
}

#[tokio::test]
async fn register_issues_six_digit_code_with_configured_ttl() -> TestResult {
    let ctx = TestContext::new_default().await?;

    let registered = ctx
        .authenticator()
        .register("alice", "alice@example.com", "s3cret-pass")
        .await?;

    assert_eq!(registered.verify_code.len(), 6);
    assert!(registered.verify_code.chars().all(|c| c.is_ascii_digit()));

    let ttl = Duration::seconds(ctx.config.verify_code_ttl_seconds as i64);
    let remaining = registered.verify_code_expiry - Utc::now();
    assert!(
        (remaining - ttl).num_seconds().abs() <= 2,
        "code expiry should respect configuration"
    );

    Ok(())
}

#[tokio::test]
async fn register_rejects_username_of_verified_account() -> TestResult {
    let ctx = TestContext::new_default().await?;
    ctx.register_verified("alice", "alice@example.com", "s3cret-pass")
        .await?;

    let err = ctx
        .authenticator()
        .register("alice", "other@example.com", "another-pass")
        .await
        .expect_err("verified username should be taken");
    assert!(matches!(err, AuthError::UsernameTaken));

    Ok(())
}

#[tokio::test]
async fn register_rejects_email_of_verified_account() -> TestResult {
    let ctx = TestContext::new_default().await?;
    ctx.register_verified("alice", "alice@example.com", "s3cret-pass")
        .await?;

    let err = ctx
        .authenticator()
        .register("bob", "alice@example.com", "another-pass")
        .await
        .expect_err("verified email should be taken");
    assert!(matches!(err, AuthError::EmailTaken));

    Ok(())
}

#[tokio::test]
async fn register_refreshes_unverified_account_with_same_email() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let first = ctx
        .authenticator()
        .register("alice", "alice@example.com", "first-pass")
        .await?;

    let second = ctx
        .authenticator()
        .register("alice", "alice@example.com", "second-pass")
        .await?;

    assert_eq!(second.id, first.id, "row should be reused, not duplicated");
    assert_ne!(
        second.verify_code, first.verify_code,
        "a fresh code should be issued"
    );

    let account_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
        .fetch_one(ctx.pool())
        .await?;
    assert_eq!(account_count, 1);

    // The old code no longer verifies, the new one does.
    let err = ctx
        .authenticator()
        .verify_account("alice", &first.verify_code)
        .await
        .expect_err("stale code should be rejected");
    assert!(matches!(err, AuthError::InvalidCode));

    let user = ctx
        .authenticator()
        .verify_account("alice", &second.verify_code)
        .await?;
    assert!(user.is_verified);

    Ok(())
}

#[tokio::test]
async fn verify_account_accepts_code_via_email_identifier() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let registered = ctx
        .authenticator()
        .register("alice", "alice@example.com", "s3cret-pass")
        .await?;

    let user = ctx
        .authenticator()
        .verify_account("alice@example.com", &registered.verify_code)
        .await?;
    assert_eq!(user.username, "alice");
    assert!(user.is_verified);

    Ok(())
}

#[tokio::test]
async fn verify_account_rejects_wrong_code() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let registered = ctx
        .authenticator()
        .register("alice", "alice@example.com", "s3cret-pass")
        .await?;

    let wrong = if registered.verify_code == "000000" {
        "111111"
    } else {
        "000000"
    };
    let err = ctx
        .authenticator()
        .verify_account("alice", wrong)
        .await
        .expect_err("wrong code should be rejected");
    assert!(matches!(err, AuthError::InvalidCode));

    Ok(())
}

#[tokio::test]
async fn verify_account_reports_expiry_before_mismatch() -> TestResult {
    let ctx = TestContext::new_default().await?;
    ctx.authenticator()
        .register("alice", "alice@example.com", "s3cret-pass")
        .await?;

    let past = (Utc::now() - Duration::hours(1)).to_rfc3339();
    sqlx::query("UPDATE accounts SET verify_code_expiry = ? WHERE username = ?")
        .bind(&past)
        .bind("alice")
        .execute(ctx.pool())
        .await?;

    // Both expired and mismatching; the expiry wins because the caller
    // needs a fresh code either way.
    let err = ctx
        .authenticator()
        .verify_account("alice", "999999")
        .await
        .expect_err("expired code should be rejected");
    assert!(matches!(err, AuthError::CodeExpired));

    Ok(())
}

#[tokio::test]
async fn verify_account_is_idempotent_for_matching_code() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let registered = ctx
        .authenticator()
        .register("alice", "alice@example.com", "s3cret-pass")
        .await?;

    ctx.authenticator()
        .verify_account("alice", &registered.verify_code)
        .await?;
    let again = ctx
        .authenticator()
        .verify_account("alice", &registered.verify_code)
        .await?;
    assert!(again.is_verified);

    Ok(())
}

#[tokio::test]
async fn verify_account_rejects_unknown_identifier() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let err = ctx
        .authenticator()
        .verify_account("nobody", "123456")
        .await
        .expect_err("unknown identifier should fail");
    assert!(matches!(err, AuthError::AccountNotFound));
    Ok(())
}

#[tokio::test]
async fn login_returns_session_for_valid_credentials() -> TestResult {
    let ctx = TestContext::new_default().await?;
    ctx.register_verified("alice", "alice@example.com", "s3cret-pass")
        .await?;

    let (user, session) = ctx
        .authenticator()
        .login("alice", "s3cret-pass")
        .await?;
    assert_eq!(user.username, "alice");

    let ttl = Duration::seconds(ctx.config.session_ttl_seconds as i64);
    let remaining = session.expires_at - Utc::now();
    assert!(
        (remaining - ttl).num_seconds().abs() <= 2,
        "session ttl should respect configuration"
    );

    let stored_expires: String =
        sqlx::query_scalar("SELECT expires_at FROM sessions WHERE token = ?")
            .bind(&session.token)
            .fetch_one(ctx.pool())
            .await?;
    let parsed = DateTime::parse_from_rfc3339(&stored_expires)?.with_timezone(&Utc);
    assert_eq!(parsed, session.expires_at);

    Ok(())
}

#[tokio::test]
async fn login_accepts_email_as_identifier() -> TestResult {
    let ctx = TestContext::new_default().await?;
    ctx.register_verified("alice", "alice@example.com", "s3cret-pass")
        .await?;

    let (user, _session) = ctx
        .authenticator()
        .login("alice@example.com", "s3cret-pass")
        .await?;
    assert_eq!(user.username, "alice");

    Ok(())
}

#[tokio::test]
async fn login_rejects_incorrect_password() -> TestResult {
    let ctx = TestContext::new_default().await?;
    ctx.register_verified("alice", "alice@example.com", "s3cret-pass")
        .await?;

    let err = ctx
        .authenticator()
        .login("alice", "bad-pass")
        .await
        .expect_err("expected invalid password");
    assert!(matches!(err, AuthError::InvalidCredentials));

    let session_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(ctx.pool())
        .await?;
    assert_eq!(session_count, 0, "no sessions should be issued on failure");

    Ok(())
}

#[tokio::test]
async fn login_rejects_unknown_identifier() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let err = ctx
        .authenticator()
        .login("nobody", "whatever-pass")
        .await
        .expect_err("unknown identifier should fail");
    assert!(matches!(err, AuthError::InvalidCredentials));
    Ok(())
}

#[tokio::test]
async fn login_rejects_unverified_account() -> TestResult {
    let ctx = TestContext::new_default().await?;
    ctx.authenticator()
        .register("alice", "alice@example.com", "s3cret-pass")
        .await?;

    let err = ctx
        .authenticator()
        .login("alice", "s3cret-pass")
        .await
        .expect_err("unverified account should not log in");
    assert!(matches!(err, AuthError::AccountNotVerified));

    Ok(())
}

#[tokio::test]
async fn authenticate_token_returns_user_and_session_for_active_token() -> TestResult {
    let ctx = TestContext::new_default().await?;
    ctx.register_verified("alice", "alice@example.com", "s3cret-pass")
        .await?;
    let (user, session) = ctx
        .authenticator()
        .login("alice", "s3cret-pass")
        .await?;

    let (resolved_user, resolved_session) = ctx
        .authenticator()
        .authenticate_token(&session.token)
        .await?;

    assert_eq!(resolved_user.id, user.id);
    assert_eq!(resolved_user.username, "alice");
    assert_eq!(resolved_session.token, session.token);
    Ok(())
}

#[tokio::test]
async fn authenticate_token_deletes_expired_sessions() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let registered = ctx
        .authenticator()
        .register("alice", "alice@example.com", "s3cret-pass")
        .await?;

    let token = "expired-token";
    let created_at = (Utc::now() - Duration::hours(2)).to_rfc3339();
    let expires_at = (Utc::now() - Duration::hours(1)).to_rfc3339();

    sqlx::query(
        "INSERT INTO sessions (account_id, token, created_at, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(registered.id)
    .bind(token)
    .bind(&created_at)
    .bind(&expires_at)
    .execute(ctx.pool())
    .await?;

    let err = ctx
        .authenticator()
        .authenticate_token(token)
        .await
        .expect_err("expired token should be rejected");
    assert!(matches!(err, AuthError::SessionExpired));

    let remaining: Option<i64> = sqlx::query_scalar("SELECT 1 FROM sessions WHERE token = ?")
        .bind(token)
        .fetch_optional(ctx.pool())
        .await?;
    assert!(
        remaining.is_none(),
        "expired session should be removed from the database"
    );

    Ok(())
}

#[tokio::test]
async fn authenticate_token_rejects_unknown_token() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let err = ctx
        .authenticator()
        .authenticate_token("missing-token")
        .await
        .expect_err("unknown token should not authenticate");
    assert!(matches!(err, AuthError::SessionNotFound));
    Ok(())
}

#[tokio::test]
async fn session_tokens_are_unique_and_urlsafe() -> TestResult {
    let ctx = TestContext::new_default().await?;
    ctx.register_verified("alice", "alice@example.com", "s3cret-pass")
        .await?;

    let mut tokens = HashSet::new();
    for _ in 0..5 {
        let (_, session) = ctx
            .authenticator()
            .login("alice", "s3cret-pass")
            .await?;
        assert!(
            URL_SAFE_NO_PAD.decode(session.token.as_bytes()).is_ok(),
            "token should be URL safe base64"
        );
        assert!(
            tokens.insert(session.token.clone()),
            "tokens should be unique per session"
        );
    }
    Ok(())
}

#[tokio::test]
async fn password_hashes_use_random_salt_per_registration() -> TestResult {
    let ctx = TestContext::new_default().await?;
    let first = ctx
        .authenticator()
        .register("alice", "alice@example.com", "same-pass")
        .await?;
    let second = ctx
        .authenticator()
        .register("bob", "bob@example.com", "same-pass")
        .await?;

    let first_hash: String = sqlx::query_scalar("SELECT password_hash FROM accounts WHERE id = ?")
        .bind(first.id)
        .fetch_one(ctx.pool())
        .await?;
    let second_hash: String = sqlx::query_scalar("SELECT password_hash FROM accounts WHERE id = ?")
        .bind(second.id)
        .fetch_one(ctx.pool())
        .await?;

    assert_ne!(
        first_hash, second_hash,
        "argon2 salts must randomise identical passwords"
    );
    Ok(())
}
