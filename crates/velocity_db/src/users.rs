//! users.db store. The core only seeds and verifies local accounts;
//! authentication flows (LDAP and friends) are external collaborators.

use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::{Executor, Row, SqlitePool};
use std::path::Path;
use uuid::Uuid;

use crate::error::DbError;
use crate::schema::USERS_SCHEMA;

#[derive(Clone)]
pub struct UsersDb {
    pool: SqlitePool,
}

impl UsersDb {
    pub async fn open(path: &Path) -> Result<Self, DbError> {
        let pool = crate::open_pool(path).await?;
        let db = Self { pool };
        db.pool.execute(USERS_SCHEMA).await?;
        Ok(db)
    }

    pub async fn open_in_memory() -> Result<Self, DbError> {
        let pool = crate::open_memory_pool().await?;
        let db = Self { pool };
        db.pool.execute(USERS_SCHEMA).await?;
        Ok(db)
    }

    /// Create a user. Returns false when the username already exists.
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        is_admin: bool,
    ) -> Result<bool, DbError> {
        let hash = hash_password(password);
        let result = sqlx::query(
            "INSERT OR IGNORE INTO users (username, password_hash, is_admin, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(username)
        .bind(hash)
        .bind(is_admin)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Seed the default admin account if no users exist yet.
    pub async fn seed_default_admin(&self, password: &str) -> Result<bool, DbError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM users")
            .fetch_one(&self.pool)
            .await?;
        if row.get::<i64, _>("n") > 0 {
            return Ok(false);
        }
        self.create_user("admin", password, true).await
    }

    pub async fn verify_password(&self, username: &str, password: &str) -> Result<bool, DbError> {
        let row = sqlx::query("SELECT password_hash FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(false) };
        let stored: String = row.get("password_hash");
        Ok(verify_hash(password, &stored))
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Salted SHA-256, stored as `salt$hash`.
fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = Sha256::digest(format!("{}{}", salt, password).as_bytes());
    format!("{}${}", salt, hex(&digest))
}

fn verify_hash(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    let digest = Sha256::digest(format!("{}{}", salt, password).as_bytes());
    hex(&digest) == expected
}
