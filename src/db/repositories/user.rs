//! User token repository
//!
//! Read-only view of the `users` table maintained by the auth system. A
//! client token is the `hashed_password` value issued at login.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Username owning the token, if any
    async fn find_username_by_token(&self, token: &str) -> Result<Option<String>>;
}

pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

const FIND_BY_TOKEN: &str = "SELECT username FROM users WHERE hashed_password = ? LIMIT 1";

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn find_username_by_token(&self, token: &str) -> Result<Option<String>> {
        let row = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(FIND_BY_TOKEN)
                .bind(token)
                .fetch_optional(self.pool.sqlite()?)
                .await
                .map(|row| row.map(|r| r.get::<String, _>("username"))),
            DatabaseDriver::Mysql => sqlx::query(FIND_BY_TOKEN)
                .bind(token)
                .fetch_optional(self.pool.mysql()?)
                .await
                .map(|row| row.map(|r| r.get::<String, _>("username"))),
        };
        row.context("Failed to look up user token")
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::db::DynDatabasePool;

    /// Insert a user row the way the auth system provisions one
    pub async fn insert_user(pool: &DynDatabasePool, username: &str, token: &str) {
        sqlx::query("INSERT INTO users (username, hashed_password, user_type) VALUES (?, ?, ?)")
            .bind(username)
            .bind(token)
            .bind("admin")
            .execute(pool.sqlite().unwrap())
            .await
            .expect("Failed to create test user");
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::insert_user;
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> (DynDatabasePool, SqlxUserRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxUserRepository::new(pool.clone());
        (pool, repo)
    }

    #[tokio::test]
    async fn test_find_username_by_token() {
        let (pool, repo) = setup_test_repo().await;
        insert_user(&pool, "analyst@example.com", "tok-123").await;

        let found = repo.find_username_by_token("tok-123").await.unwrap();
        assert_eq!(found.as_deref(), Some("analyst@example.com"));
    }

    #[tokio::test]
    async fn test_unknown_token_returns_none() {
        let (pool, repo) = setup_test_repo().await;
        insert_user(&pool, "analyst@example.com", "tok-123").await;

        assert!(repo.find_username_by_token("tok-999").await.unwrap().is_none());
        assert!(repo.find_username_by_token("").await.unwrap().is_none());
    }
}
