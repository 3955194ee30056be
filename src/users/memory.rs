use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::users::model::{NewUser, User, UserChanges};
use crate::users::store::{RepoError, UniqueField, UserStore};

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: Vec<User>, // kept in id order
}

impl Inner {
    fn taken(&self, field: UniqueField, value: &str, except: Option<i64>) -> bool {
        self.users.iter().any(|u| {
            Some(u.id) != except
                && match field {
                    UniqueField::Email => u.email == value,
                    UniqueField::Username => u.username == value,
                }
        })
    }
}

/// Process-local store. Every check-and-write happens under one lock.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: Mutex<Inner>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn find(&self, pred: impl Fn(&User) -> bool) -> Option<User> {
        self.lock().users.iter().find(|u| pred(u)).cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, new: NewUser) -> Result<User, RepoError> {
        let mut inner = self.lock();
        if inner.taken(UniqueField::Email, &new.email, None) {
            return Err(RepoError::Duplicate(UniqueField::Email));
        }
        if inner.taken(UniqueField::Username, &new.username, None) {
            return Err(RepoError::Duplicate(UniqueField::Username));
        }

        inner.next_id += 1;
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: inner.next_id,
            email: new.email,
            username: new.username,
            password_hash: new.password_hash,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        Ok(self.find(|u| u.id == id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        Ok(self.find(|u| u.email == email))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        Ok(self.find(|u| u.username == username))
    }

    async fn list_active(&self, limit: i64, offset: i64) -> Result<Vec<User>, RepoError> {
        let inner = self.lock();
        Ok(inner
            .users
            .iter()
            .filter(|u| u.is_active)
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<Option<User>, RepoError> {
        let mut inner = self.lock();
        let Some(idx) = inner.users.iter().position(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = &changes.email {
            if inner.taken(UniqueField::Email, email, Some(id)) {
                return Err(RepoError::Duplicate(UniqueField::Email));
            }
        }
        if let Some(username) = &changes.username {
            if inner.taken(UniqueField::Username, username, Some(id)) {
                return Err(RepoError::Duplicate(UniqueField::Username));
            }
        }

        let user = &mut inner.users[idx];
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        if let Some(active) = changes.is_active {
            user.is_active = active;
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }
}
