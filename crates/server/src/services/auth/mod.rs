//! Authentication service.
//!
//! Password registration and login, plus the bearer tokens handed back to
//! clients.

mod error;
mod token;

pub use error::AuthError;
pub use token::TokenAuthenticator;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::instrument;

use emporium_core::{Email, UserId};

use crate::db::{RepositoryError, UserStore};
use crate::models::{NewUser, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration form after deserialization.
#[derive(Debug)]
pub struct Registration<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
}

/// A successful registration or login.
#[derive(Debug)]
pub struct Session {
    pub user_id: UserId,
    pub token: String,
}

/// Authentication service.
///
/// Handles user registration and login.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
    tokens: &'a TokenAuthenticator,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserStore, tokens: &'a TokenAuthenticator) -> Self {
        Self { users, tokens }
    }

    /// Register a new user with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` if the name is blank.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::PasswordMismatch` if the confirmation differs.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip_all)]
    pub async fn register(&self, form: &Registration<'_>) -> Result<(User, Session), AuthError> {
        let name = form.name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingField("name"));
        }

        let email = Email::parse(form.email)?;

        if form.password != form.confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(form.password)?;

        let password_hash = hash_password(form.password)?;

        let user = self
            .users
            .create(
                &NewUser {
                    user_name: name.to_owned(),
                    email,
                },
                &password_hash,
            )
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        let token = self.tokens.issue(user.id)?;
        tracing::info!(user_id = %user.id, "user registered");

        let session = Session {
            user_id: user.id,
            token,
        };
        Ok((user, session))
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        // Unparseable emails cannot belong to anyone
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user_id, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let token = self.tokens.issue(user_id)?;
        Ok(Session { user_id, token })
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::config::TokenConfig;
    use crate::db::MemoryStore;

    fn tokens() -> TokenAuthenticator {
        TokenAuthenticator::new(&TokenConfig {
            secret: SecretString::from("k9#Lq2$vB7!xR4@pZ8&mT1^wN6*cY3%h".to_owned()),
            ttl: chrono::Duration::hours(1),
        })
    }

    fn form<'a>(email: &'a str, password: &'a str, confirm: &'a str) -> Registration<'a> {
        Registration {
            name: "Ada",
            email,
            password,
            confirm_password: confirm,
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);

        let (user, session) = auth
            .register(&form("ada@example.com", "hunter22", "hunter22"))
            .await
            .unwrap();
        assert_eq!(user.user_name, "Ada");
        assert!(user.cart.is_empty());
        assert_eq!(tokens.verify(&session.token).unwrap(), user.id);

        let login = auth.login("ADA@example.com", "hunter22").await.unwrap();
        assert_eq!(login.user_id, user.id);
    }

    #[tokio::test]
    async fn test_register_rejects_mismatch_and_duplicates() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);

        let mismatch = auth
            .register(&form("b@example.com", "hunter22", "hunter23"))
            .await;
        assert!(matches!(mismatch, Err(AuthError::PasswordMismatch)));

        auth.register(&form("b@example.com", "hunter22", "hunter22"))
            .await
            .unwrap();
        let duplicate = auth
            .register(&form("b@example.com", "another1", "another1"))
            .await;
        assert!(matches!(duplicate, Err(AuthError::UserAlreadyExists)));
    }

    #[tokio::test]
    async fn test_register_rejects_short_password_and_bad_email() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);

        assert!(matches!(
            auth.register(&form("c@example.com", "short", "short")).await,
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            auth.register(&form("not-an-email", "hunter22", "hunter22"))
                .await,
            Err(AuthError::InvalidEmail(_))
        ));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let store = MemoryStore::new();
        let tokens = tokens();
        let auth = AuthService::new(&store, &tokens);
        auth.register(&form("d@example.com", "hunter22", "hunter22"))
            .await
            .unwrap();

        assert!(matches!(
            auth.login("d@example.com", "wrong-password").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("nobody@example.com", "hunter22").await,
            Err(AuthError::InvalidCredentials)
        ));
    }
}
