//! Signed bearer tokens.
//!
//! A token is `base64url(claims).base64url(hmac_sha256(secret, base64url(claims)))`
//! where the claims are `{"sub": <user id>, "iat": <unix>, "exp": <unix>}`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use emporium_core::UserId;

use super::AuthError;
use crate::config::TokenConfig;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: UserId,
    iat: i64,
    exp: i64,
}

/// Issues and verifies bearer tokens.
#[derive(Clone)]
pub struct TokenAuthenticator {
    secret: SecretString,
    ttl: Duration,
}

impl std::fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthenticator")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenAuthenticator {
    #[must_use]
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            secret: config.secret.clone(),
            ttl: config.ttl,
        }
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| AuthError::TokenSigning)
    }

    /// Issue a token for `user` valid from now.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if the claims cannot be encoded.
    pub fn issue(&self, user: UserId) -> Result<String, AuthError> {
        self.issue_at(user, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if the claims cannot be encoded.
    pub fn issue_at(&self, user: UserId, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        let json = serde_json::to_vec(&claims).map_err(|_| AuthError::TokenSigning)?;
        let payload = URL_SAFE_NO_PAD.encode(json);

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{payload}.{signature}"))
    }

    /// Verify a token and return its subject.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for malformed or forged tokens and
    /// `AuthError::ExpiredToken` once the expiry has passed.
    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// See [`TokenAuthenticator::verify`].
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<UserId, AuthError> {
        let (payload, signature) = token.split_once('.').ok_or(AuthError::InvalidToken)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::InvalidToken)?;

        // Constant-time comparison
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidToken)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AuthError::InvalidToken)?;
        let claims: Claims = serde_json::from_slice(&json).map_err(|_| AuthError::InvalidToken)?;

        if claims.exp <= now.timestamp() {
            return Err(AuthError::ExpiredToken);
        }
        Ok(claims.sub)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn authenticator(secret: &str) -> TokenAuthenticator {
        TokenAuthenticator::new(&TokenConfig {
            secret: SecretString::from(secret.to_owned()),
            ttl: Duration::hours(1),
        })
    }

    #[test]
    fn test_issue_then_verify() {
        let auth = authenticator("k9#Lq2$vB7!xR4@pZ8&mT1^wN6*cY3%h");
        let user = UserId::generate();
        let token = auth.issue(user).unwrap();
        assert_eq!(auth.verify(&token).unwrap(), user);
    }

    #[test]
    fn test_expired_token_rejected() {
        let auth = authenticator("k9#Lq2$vB7!xR4@pZ8&mT1^wN6*cY3%h");
        let issued = Utc::now() - Duration::hours(2);
        let token = auth.issue_at(UserId::generate(), issued).unwrap();
        assert!(matches!(auth.verify(&token), Err(AuthError::ExpiredToken)));
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = authenticator("k9#Lq2$vB7!xR4@pZ8&mT1^wN6*cY3%h")
            .issue(UserId::generate())
            .unwrap();
        let other = authenticator("Q1w@E3r$T5y^U7i*O9p(A2s#D4f%G6h&");
        assert!(matches!(other.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let auth = authenticator("k9#Lq2$vB7!xR4@pZ8&mT1^wN6*cY3%h");
        let token = auth.issue(UserId::generate()).unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let forged_claims = Claims {
            sub: UserId::generate(),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{forged_payload}.{signature}");

        assert!(matches!(auth.verify(&forged), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_garbage_rejected() {
        let auth = authenticator("k9#Lq2$vB7!xR4@pZ8&mT1^wN6*cY3%h");
        for token in ["", "abc", "a.b.c", "!!!.???"] {
            assert!(matches!(auth.verify(token), Err(AuthError::InvalidToken)));
        }
    }
}
