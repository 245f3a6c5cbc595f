//! Token validation
//!
//! Every report endpoint checks the caller's token once, before touching the
//! report table.

use crate::db::repositories::UserRepository;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Whether the token belongs to a known user
    async fn validate(&self, token: &str) -> Result<bool>;
}

/// Validates tokens against the `users` table
pub struct SqlxTokenValidator {
    users: Arc<dyn UserRepository>,
}

impl SqlxTokenValidator {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl TokenValidator for SqlxTokenValidator {
    async fn validate(&self, token: &str) -> Result<bool> {
        if token.is_empty() {
            return Ok(false);
        }
        match self.users.find_username_by_token(token).await? {
            Some(username) => {
                tracing::debug!(user = %username, "Token accepted");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::user::test_support::insert_user;
    use crate::db::repositories::SqlxUserRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_validator() -> (crate::db::DynDatabasePool, SqlxTokenValidator) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let validator = SqlxTokenValidator::new(SqlxUserRepository::boxed(pool.clone()));
        (pool, validator)
    }

    #[tokio::test]
    async fn test_known_token_is_valid() {
        let (pool, validator) = setup_validator().await;
        insert_user(&pool, "admin", "secret-token").await;

        assert!(validator.validate("secret-token").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_or_empty_token_is_invalid() {
        let (pool, validator) = setup_validator().await;
        insert_user(&pool, "admin", "secret-token").await;

        assert!(!validator.validate("other-token").await.unwrap());
        assert!(!validator.validate("").await.unwrap());
    }
}
