use std::sync::Arc;

use crate::auth::password::hash_password;
use crate::users::model::{NewUser, User, UserChanges, UserUpdate};
use crate::users::store::{RepoError, UserStore};

pub const MAX_PAGE_SIZE: i64 = 100;

/// Owns every write to user records. Cheap to clone.
#[derive(Clone)]
pub struct UserRepository {
    store: Arc<dyn UserStore>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Create a new user with hashed password.
    pub async fn create(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<User, RepoError> {
        let password_hash = hash_password(password)?;
        self.store
            .insert(NewUser {
                email: email.to_owned(),
                username: username.to_owned(),
                password_hash,
            })
            .await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        self.store.find_by_id(id).await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        self.store.find_by_email(email).await
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        self.store.find_by_username(username).await
    }

    pub async fn list_active(&self, limit: i64, offset: i64) -> Result<Vec<User>, RepoError> {
        self.store
            .list_active(limit.clamp(0, MAX_PAGE_SIZE), offset.max(0))
            .await
    }

    /// Apply allowlisted changes; a new password is re-hashed.
    pub async fn update(&self, id: i64, update: UserUpdate) -> Result<Option<User>, RepoError> {
        let password_hash = update.password.as_deref().map(hash_password).transpose()?;
        let changes = UserChanges {
            email: update.email,
            username: update.username,
            password_hash,
            is_active: update.is_active,
        };
        self.store.update(id, changes).await
    }

    /// Deactivate instead of deleting. `false` if the id is unknown.
    pub async fn soft_delete(&self, id: i64) -> Result<bool, RepoError> {
        let changes = UserChanges {
            is_active: Some(false),
            ..Default::default()
        };
        Ok(self.store.update(id, changes).await?.is_some())
    }
}
