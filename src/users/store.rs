use std::fmt;

use async_trait::async_trait;

use crate::auth::password::PasswordError;
use crate::users::model::{NewUser, User, UserChanges};

/// Column guarded by a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Username,
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UniqueField::Email => f.write_str("email"),
            UniqueField::Username => f.write_str("username"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{0} already exists")]
    Duplicate(UniqueField),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Persistence seam for user records.
///
/// Implementations must reject an `insert` or `update` that would duplicate an
/// email or username with [`RepoError::Duplicate`], atomically with the write.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, new: NewUser) -> Result<User, RepoError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepoError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
    /// Active users ordered by id.
    async fn list_active(&self, limit: i64, offset: i64) -> Result<Vec<User>, RepoError>;
    /// Applies `changes` and bumps `updated_at`. `Ok(None)` if the id is unknown.
    async fn update(&self, id: i64, changes: UserChanges) -> Result<Option<User>, RepoError>;
}
