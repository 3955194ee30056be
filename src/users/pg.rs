use async_trait::async_trait;
use sqlx::PgPool;

use crate::users::model::{NewUser, User, UserChanges};
use crate::users::store::{RepoError, UniqueField, UserStore};

const USER_COLUMNS: &str =
    "id, email, username, password_hash, is_active, created_at, updated_at";

/// `users` table in PostgreSQL. Uniqueness comes from the
/// `users_email_key` / `users_username_key` constraints.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_write_error(err: sqlx::Error) -> RepoError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some(c) if c.contains("username") => UniqueField::Username,
                _ => UniqueField::Email,
            };
            return RepoError::Duplicate(field);
        }
    }
    RepoError::Database(err)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, new: NewUser) -> Result<User, RepoError> {
        let sql = format!(
            r#"
            INSERT INTO users (email, username, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&new.email)
            .bind(&new.username)
            .bind(&new.password_hash)
            .fetch_one(&self.db)
            .await
            .map_err(map_write_error)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn list_active(&self, limit: i64, offset: i64) -> Result<Vec<User>, RepoError> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE is_active = TRUE
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#
        );
        let rows = sqlx::query_as::<_, User>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<Option<User>, RepoError> {
        let sql = format!(
            r#"
            UPDATE users
            SET email = COALESCE($2, email),
                username = COALESCE($3, username),
                password_hash = COALESCE($4, password_hash),
                is_active = COALESCE($5, is_active),
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.email)
            .bind(changes.username)
            .bind(changes.password_hash)
            .bind(changes.is_active)
            .fetch_optional(&self.db)
            .await
            .map_err(map_write_error)
    }
}
