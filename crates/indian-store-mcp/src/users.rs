//! User credential store.
//!
//! The login flow authenticates against a [`UserStore`]; the consent flow reads
//! the user's display name from it. [`InMemoryUserStore`] keeps Argon2id hashes
//! in memory and is seeded with a demo administrator.

use std::collections::HashMap;
use std::sync::OnceLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::UserStoreError;

/// Email of the seeded administrator.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@indian-store.com";
/// Password of the seeded administrator.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
/// Display name of the seeded administrator.
pub const DEFAULT_ADMIN_NAME: &str = "Admin User";

/// A user account, without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Credential store consulted by the login and consent flows.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Verify a password. Unknown emails and wrong passwords both yield
    /// [`UserStoreError::InvalidCredentials`].
    async fn authenticate(&self, email: &str, password: &str) -> Result<User, UserStoreError>;

    /// Look up a user by email.
    async fn get_user(&self, email: &str) -> Result<User, UserStoreError>;

    /// Create a user. Fails with [`UserStoreError::DuplicateUser`] if the email is taken.
    async fn add_user(&self, email: &str, password: &str, name: &str) -> Result<(), UserStoreError>;

    /// All users, newest first.
    async fn list_users(&self) -> Result<Vec<User>, UserStoreError>;

    /// Remove a user. Fails with [`UserStoreError::NotFound`] if absent.
    async fn delete_user(&self, email: &str) -> Result<(), UserStoreError>;
}

struct StoredUser {
    user: User,
    password_hash: String,
}

/// In-memory [`UserStore`] with Argon2id password hashes.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, StoredUser>>,
}

impl InMemoryUserStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding only the default administrator.
    pub fn with_default_admin() -> Result<Self, UserStoreError> {
        let admin = StoredUser {
            user: User {
                email: DEFAULT_ADMIN_EMAIL.to_string(),
                name: DEFAULT_ADMIN_NAME.to_string(),
                created_at: Utc::now(),
            },
            password_hash: hash_password(DEFAULT_ADMIN_PASSWORD)?,
        };
        tracing::info!(
            email = DEFAULT_ADMIN_EMAIL,
            "No users found, created default admin user"
        );

        let users = HashMap::from([(DEFAULT_ADMIN_EMAIL.to_string(), admin)]);
        Ok(Self {
            users: RwLock::new(users),
        })
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn authenticate(&self, email: &str, password: &str) -> Result<User, UserStoreError> {
        let found = self
            .users
            .read()
            .await
            .get(email)
            .map(|stored| (stored.user.clone(), stored.password_hash.clone()));

        let Some((user, hash)) = found else {
            // Unknown emails cost the same as a wrong password
            if let Some(hash) = dummy_hash() {
                let _ = verify_password(password, hash.to_string()).await;
            }
            return Err(UserStoreError::InvalidCredentials);
        };

        verify_password(password, hash).await?;
        Ok(user)
    }

    async fn get_user(&self, email: &str) -> Result<User, UserStoreError> {
        self.users
            .read()
            .await
            .get(email)
            .map(|stored| stored.user.clone())
            .ok_or_else(|| UserStoreError::NotFound(email.to_string()))
    }

    async fn add_user(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<(), UserStoreError> {
        // Hash outside the lock
        let password_hash = hash_password(password)?;

        let mut users = self.users.write().await;
        if users.contains_key(email) {
            return Err(UserStoreError::DuplicateUser(email.to_string()));
        }
        users.insert(
            email.to_string(),
            StoredUser {
                user: User {
                    email: email.to_string(),
                    name: name.to_string(),
                    created_at: Utc::now(),
                },
                password_hash,
            },
        );
        tracing::info!(email, name, "User created");
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, UserStoreError> {
        let mut users: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .map(|s| s.user.clone())
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn delete_user(&self, email: &str) -> Result<(), UserStoreError> {
        match self.users.write().await.remove(email) {
            Some(_) => {
                tracing::info!(email, "User deleted");
                Ok(())
            }
            None => Err(UserStoreError::NotFound(email.to_string())),
        }
    }
}

impl std::fmt::Debug for InMemoryUserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryUserStore").finish_non_exhaustive()
    }
}

fn hash_password(password: &str) -> Result<String, UserStoreError> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
        .map_err(|e| UserStoreError::Hash(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserStoreError::Hash(e.to_string()))
}

fn check_password(password: &str, hash: &str) -> Result<(), UserStoreError> {
    let parsed = PasswordHash::new(hash).map_err(|e| UserStoreError::Hash(e.to_string()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| UserStoreError::InvalidCredentials)
}

/// Run the Argon2 check on the blocking pool.
async fn verify_password(password: &str, hash: String) -> Result<(), UserStoreError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || check_password(&password, &hash))
        .await
        .map_err(|e| UserStoreError::Hash(e.to_string()))?
}

/// Hash of a random password, verified against when the email is unknown.
fn dummy_hash() -> Option<&'static str> {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();
    DUMMY_HASH
        .get_or_init(|| hash_password(&uuid::Uuid::new_v4().to_string()).ok())
        .as_deref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_admin_authenticates() {
        let store = InMemoryUserStore::with_default_admin().unwrap();
        let user = store
            .authenticate(DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD)
            .await
            .unwrap();
        assert_eq!(user.name, DEFAULT_ADMIN_NAME);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_the_same() {
        let store = InMemoryUserStore::with_default_admin().unwrap();

        let wrong = store
            .authenticate(DEFAULT_ADMIN_EMAIL, "nope")
            .await
            .unwrap_err();
        let unknown = store
            .authenticate("ghost@example.com", "admin123")
            .await
            .unwrap_err();

        assert!(matches!(wrong, UserStoreError::InvalidCredentials));
        assert!(matches!(unknown, UserStoreError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_duplicate_user() {
        let store = InMemoryUserStore::new();
        store.add_user("a@example.com", "pw", "A").await.unwrap();
        let err = store
            .add_user("a@example.com", "pw2", "A again")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UserStoreError::DuplicateUser(email) if email == "a@example.com"
        ));
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let store = InMemoryUserStore::new();
        store.add_user("a@example.com", "pw", "A").await.unwrap();
        store.add_user("b@example.com", "pw", "B").await.unwrap();
        assert_eq!(store.list_users().await.unwrap().len(), 2);

        store.delete_user("a@example.com").await.unwrap();
        assert!(matches!(
            store.delete_user("a@example.com").await,
            Err(UserStoreError::NotFound(_))
        ));
        assert!(matches!(
            store.get_user("a@example.com").await,
            Err(UserStoreError::NotFound(_))
        ));

        let remaining = store.list_users().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].email, "b@example.com");
    }

    #[test]
    fn test_hash_is_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
        assert!(check_password("same", &a).is_ok());
    }

    #[tokio::test]
    async fn test_dummy_hash_never_matches() {
        let hash = dummy_hash().unwrap();
        assert!(PasswordHash::new(hash).is_ok());
        assert_eq!(dummy_hash(), Some(hash));

        for guess in ["", DEFAULT_ADMIN_PASSWORD, "password"] {
            let result = verify_password(guess, hash.to_string()).await;
            assert!(matches!(result, Err(UserStoreError::InvalidCredentials)));
        }
    }
}
