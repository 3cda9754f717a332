//! Accounts

use tracing::{info, instrument, warn};

use super::{required, Catalog};
use crate::error::{Error, Result};
use crate::model::{Role, User};
use crate::storage::Order;

#[cfg(not(test))]
const HASH_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const HASH_COST: u32 = 4;

/// Hash a password with bcrypt on the blocking pool
async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, HASH_COST))
        .await
        .map_err(|e| Error::Internal(e.to_string()))?
        .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))
}

async fn verify_password(password: String, hash: String) -> Result<bool> {
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| Error::Internal(e.to_string()))?;
    // A malformed stored hash never matches
    Ok(verified.unwrap_or(false))
}

impl Catalog {
    /// Register a `USER` account. Emails are unique, compared
    /// case-insensitively.
    #[instrument(skip(self, password))]
    pub async fn register(&self, name: String, email: String, password: String) -> Result<User> {
        let name = required(name, "name")?;
        let email = required(email, "email")?.trim().to_lowercase();
        let password = required(password, "password")?;
        let hash = hash_password(password).await?;

        let users = self.users.lock().await;
        let taken = {
            let email = email.clone();
            move |u: &User| u.email == email
        };
        if !users.list(Order::Ascending, Some(&taken)).await?.is_empty() {
            return Err(Error::InvalidArgument("User already exists".to_string()));
        }
        let user = users
            .insert(User {
                id: 0,
                name,
                email,
                password: hash,
                role: Role::User,
            })
            .await?;
        info!(id = user.id, "User registered");
        Ok(user)
    }

    /// Check credentials. Unknown email and wrong password are reported
    /// the same way.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: String) -> Result<User> {
        let invalid = || Error::InvalidArgument("Invalid credentials".to_string());
        let user = self.user_by_email(email).await?.ok_or_else(invalid)?;
        if !verify_password(password, user.password.clone()).await? {
            warn!(id = user.id, "Password mismatch");
            return Err(invalid());
        }
        Ok(user)
    }

    pub async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        let matching = move |u: &User| u.email == email;
        Ok(self
            .users
            .list(Order::Ascending, Some(&matching))
            .await?
            .into_iter()
            .next())
    }

    pub async fn set_role(&self, id: u32, role: Role) -> Result<User> {
        let user = self.users.update(id, move |u| u.role = role).await?;
        info!(id, role = %role, "Role updated");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_authenticate() -> Result<()> {
        let catalog = Catalog::in_memory().await?;
        let user = catalog
            .register("Ana".to_string(), "Ana@Example.com".to_string(), "s3cret".to_string())
            .await?;
        assert_eq!((user.id, user.role), (1, Role::User));
        assert_ne!(user.password, "s3cret");

        let found = catalog.authenticate("ana@example.com", "s3cret".to_string()).await?;
        assert_eq!(found.id, 1);

        let err = catalog
            .authenticate("ana@example.com", "wrong".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() -> Result<()> {
        let catalog = Catalog::in_memory().await?;
        catalog
            .register("Ana".to_string(), "ana@example.com".to_string(), "a".to_string())
            .await?;
        let err = catalog
            .register("Other".to_string(), "ANA@example.com".to_string(), "b".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        Ok(())
    }

    #[tokio::test]
    async fn test_set_role() -> Result<()> {
        let catalog = Catalog::in_memory().await?;
        catalog
            .register("Ana".to_string(), "ana@example.com".to_string(), "a".to_string())
            .await?;
        assert_eq!(catalog.set_role(1, Role::SuperAdmin).await?.role, Role::SuperAdmin);
        assert!(matches!(
            catalog.set_role(2, Role::Admin).await,
            Err(Error::NotFound(_))
        ));
        Ok(())
    }
}
