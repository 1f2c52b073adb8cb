//! # User Directory
//!
//! Registered identities with roles and Argon2id password hashes.

use crate::store::ContentStore;
use crate::validation;
use crate::{Credential, ManhajError, Role, User, UserId};
use chrono::Utc;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Input for [`UserDirectory::create`].
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Listing row: the user's public fields plus how many nodes they author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: chrono::DateTime<Utc>,
    pub node_count: usize,
}

#[derive(Clone, Copy)]
pub struct UserDirectory<'a> {
    store: &'a dyn ContentStore,
}

impl<'a> UserDirectory<'a> {
    pub fn new(store: &'a dyn ContentStore) -> Self {
        Self { store }
    }

    /// Register a user. Every field is required; the email must be unused.
    pub fn create(&self, new: NewUser) -> Result<User, ManhajError> {
        let name = validation::user_name(&new.name)?;
        let email = validation::email(&new.email)?;
        validation::password(&new.password)?;

        let user = User {
            id: UserId::generate(),
            name,
            email,
            role: new.role,
            credential: Credential::derive(&new.password)?,
            created_at: Utc::now(),
        };
        self.store.insert_user(&user)?;
        tracing::info!(user_id = %user.id, role = %user.role, "created user");
        Ok(user)
    }

    pub fn get(&self, id: &UserId) -> Result<User, ManhajError> {
        self.store
            .user(id)?
            .ok_or_else(|| ManhajError::UserNotFound(id.clone()))
    }

    /// Look up by email, normalized the same way as on creation.
    pub fn find_by_email(&self, email: &str) -> Result<Option<User>, ManhajError> {
        self.store.user_by_email(&email.trim().to_lowercase())
    }

    /// Every user, newest first, with authored-node counts.
    pub fn list(&self) -> Result<Vec<UserSummary>, ManhajError> {
        let mut counts: BTreeMap<UserId, usize> = BTreeMap::new();
        for node in self.store.nodes()? {
            if let Some(author) = node.author_id {
                *counts.entry(author).or_default() += 1;
            }
        }

        let mut users = self.store.users()?;
        users.sort_by_key(|u| (Reverse(u.created_at), u.id.clone()));
        Ok(users
            .into_iter()
            .map(|u| UserSummary {
                node_count: counts.get(&u.id).copied().unwrap_or(0),
                id: u.id,
                name: u.name,
                email: u.email,
                role: u.role,
                created_at: u.created_at,
            })
            .collect())
    }

    /// Remove a contributor account. Admin accounts cannot be deleted.
    /// Nodes they authored stay, with the author detached.
    pub fn delete(&self, id: &UserId) -> Result<User, ManhajError> {
        let removed = self.store.remove_user(id, &mut |user| {
            if user.role == Role::Admin {
                Err(ManhajError::forbidden("admin accounts cannot be deleted"))
            } else {
                Ok(())
            }
        })?;
        tracing::info!(user_id = %id, "deleted user");
        Ok(removed)
    }

    /// Check an email/password pair. Unknown emails and wrong passwords are
    /// indistinguishable to the caller.
    pub fn verify(&self, email: &str, password: &str) -> Result<Option<User>, ManhajError> {
        Ok(self
            .find_by_email(email)?
            .filter(|user| user.credential.verify(password)))
    }
}
