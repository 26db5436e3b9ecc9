//! Message repository operating on the embedded message lists.

use crate::entities::account::parse_message_list;
use crate::entities::message::Message;
use crate::types::{AccountError, AccountResult};
use sqlx::SqlitePool;

/// Repository for the anonymous messages embedded in account rows.
///
/// Every mutation is a single UPDATE against the owning row, so two
/// concurrent appends both land and a delete never clobbers a
/// concurrent insert.
#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a message to the end of an account's list.
    pub async fn append(&self, account_id: i64, message: &Message) -> AccountResult<()> {
        let payload = serde_json::to_string(message)
            .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

        let result = sqlx::query(
            "UPDATE accounts SET messages = json_insert(messages, '$[#]', json(?)) WHERE id = ?",
        )
        .bind(&payload)
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AccountError::NotFound);
        }

        tracing::debug!(account_id, message_id = %message.id, "message appended");
        Ok(())
    }

    /// Remove a message from an account's list by its identifier.
    ///
    /// The list is rebuilt without the matching entry. The EXISTS guard
    /// keeps the UPDATE from touching the row when the identifier is not
    /// present, so a repeated delete reports `MessageNotFound`.
    pub async fn remove(&self, account_id: i64, message_id: &str) -> AccountResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET messages = (
                SELECT json_group_array(json(value))
                FROM json_each(accounts.messages)
                WHERE json_extract(value, '$._id') IS NOT ?
            )
            WHERE id = ?
              AND EXISTS (
                SELECT 1 FROM json_each(accounts.messages)
                WHERE json_extract(value, '$._id') = ?
              )
            "#,
        )
        .bind(message_id)
        .bind(account_id)
        .bind(message_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AccountError::MessageNotFound);
        }

        tracing::debug!(account_id, message_id, "message removed");
        Ok(())
    }

    /// List an account's messages, newest first.
    pub async fn list_newest_first(&self, account_id: i64) -> AccountResult<Vec<Message>> {
        let raw: Option<String> = sqlx::query_scalar("SELECT messages FROM accounts WHERE id = ?")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

        let raw = raw.ok_or(AccountError::NotFound)?;
        let mut messages = parse_message_list(&raw)?;
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(messages)
    }

    /// Number of messages currently stored for an account.
    pub async fn count(&self, account_id: i64) -> AccountResult<i64> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT json_array_length(messages) FROM accounts WHERE id = ?")
                .bind(account_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AccountError::DatabaseError(e.to_string()))?;

        count.ok_or(AccountError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::account::CreateAccountRequest;
    use crate::migrations::MIGRATOR;
    use crate::repos::AccountRepository;
    use chrono::{Duration, Utc};
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
    use std::str::FromStr;
    use tempfile::TempDir;

    async fn create_test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db_url = format!("sqlite://{}", db_path.display());

        let options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .unwrap();
        MIGRATOR.run(&pool).await.unwrap();

        (pool, temp_dir)
    }

    async fn create_account(pool: &SqlitePool, username: &str) -> i64 {
        let repo = AccountRepository::new(pool.clone());
        let account = repo
            .create(&CreateAccountRequest {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password_hash: "$argon2id$fake".to_string(),
                verify_code: "123456".to_string(),
                verify_code_expiry: "2099-01-01T00:00:00+00:00".to_string(),
            })
            .await
            .unwrap();
        account.id
    }

    #[tokio::test]
    async fn test_append_and_list() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = MessageRepository::new(pool.clone());
        let account_id = create_account(&pool, "alice").await;

        let message = Message::new("hello there");
        repo.append(account_id, &message).await.unwrap();

        let messages = repo.list_newest_first(account_id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, message.id);
        assert_eq!(messages[0].content, "hello there");
    }

    #[tokio::test]
    async fn test_append_to_unknown_account_is_not_found() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = MessageRepository::new(pool);

        let err = repo.append(999, &Message::new("hello")).await.unwrap_err();
        assert!(matches!(err, AccountError::NotFound));
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = MessageRepository::new(pool.clone());
        let account_id = create_account(&pool, "alice").await;

        let base = Utc::now();
        for (offset, content) in [(0, "oldest"), (1, "middle"), (2, "newest")] {
            let mut message = Message::new(content);
            message.created_at = base + Duration::seconds(offset);
            repo.append(account_id, &message).await.unwrap();
        }

        let messages = repo.list_newest_first(account_id).await.unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["newest", "middle", "oldest"]);
    }

    #[tokio::test]
    async fn test_interleaved_appends_both_survive() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = MessageRepository::new(pool.clone());
        let account_id = create_account(&pool, "alice").await;

        let first = Message::new("from one visitor");
        let second = Message::new("from another visitor");

        let (a, b) = tokio::join!(
            repo.append(account_id, &first),
            repo.append(account_id, &second)
        );
        a.unwrap();
        b.unwrap();

        let messages = repo.list_newest_first(account_id).await.unwrap();
        assert_eq!(messages.len(), 2);
        let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        assert!(ids.contains(&first.id.as_str()));
        assert!(ids.contains(&second.id.as_str()));
    }

    #[tokio::test]
    async fn test_remove_deletes_only_the_target() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = MessageRepository::new(pool.clone());
        let account_id = create_account(&pool, "alice").await;

        let keep = Message::new("keep me");
        let drop = Message::new("drop me");
        repo.append(account_id, &keep).await.unwrap();
        repo.append(account_id, &drop).await.unwrap();

        repo.remove(account_id, &drop.id).await.unwrap();

        let messages = repo.list_newest_first(account_id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, keep.id);
    }

    #[tokio::test]
    async fn test_remove_twice_is_message_not_found() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = MessageRepository::new(pool.clone());
        let account_id = create_account(&pool, "alice").await;

        let message = Message::new("delete me");
        repo.append(account_id, &message).await.unwrap();

        repo.remove(account_id, &message.id).await.unwrap();
        let err = repo.remove(account_id, &message.id).await.unwrap_err();
        assert!(matches!(err, AccountError::MessageNotFound));
    }

    #[tokio::test]
    async fn test_remove_is_scoped_to_the_owner() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = MessageRepository::new(pool.clone());
        let alice = create_account(&pool, "alice").await;
        let bob = create_account(&pool, "bob").await;

        let message = Message::new("for alice only");
        repo.append(alice, &message).await.unwrap();

        let err = repo.remove(bob, &message.id).await.unwrap_err();
        assert!(matches!(err, AccountError::MessageNotFound));
        assert_eq!(repo.count(alice).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_count_tracks_appends() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = MessageRepository::new(pool.clone());
        let account_id = create_account(&pool, "alice").await;

        assert_eq!(repo.count(account_id).await.unwrap(), 0);
        repo.append(account_id, &Message::new("one")).await.unwrap();
        repo.append(account_id, &Message::new("two")).await.unwrap();
        assert_eq!(repo.count(account_id).await.unwrap(), 2);
    }
}
