//! Signed, expiring tokens.
//!
//! Every token is an HS256 JWT whose `aud` claim names its purpose. Each
//! purpose also signs with its own key derived from the configured secret, so
//! a reset token can never pass as a session token and vice versa even if the
//! audience check were skipped.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use launchpad_types::models::{AuthenticatedUser, Role};

pub const SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const RESET_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token signing secret is not configured")]
    MissingSecret,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Session,
    Reset,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::Session => "session",
            Purpose::Reset => "reset",
        }
    }
}

/// Identity carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
}

impl From<&AuthenticatedUser> for SessionClaims {
    fn from(user: &AuthenticatedUser) -> Self {
        Self {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Payload of a password reset token. `fingerprint` pins the token to the
/// password hash it was issued against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetClaims {
    pub sub: Uuid,
    pub fingerprint: String,
}

impl ResetClaims {
    pub fn is_current_for(&self, password_hash: &str) -> bool {
        self.fingerprint == password_fingerprint(password_hash)
    }
}

pub fn password_fingerprint(password_hash: &str) -> String {
    let digest = Sha256::digest(password_hash.as_bytes());
    hex::encode(&digest[..8])
}

#[derive(Serialize, Deserialize)]
struct Envelope<P> {
    #[serde(flatten)]
    payload: P,
    aud: String,
    iat: i64,
    exp: i64,
}

struct PurposeKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl PurposeKeys {
    fn derive(secret: &str, purpose: Purpose) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hasher.update([0u8]);
        hasher.update(purpose.as_str().as_bytes());
        let key = hasher.finalize();

        Self {
            encoding: EncodingKey::from_secret(&key),
            decoding: DecodingKey::from_secret(&key),
        }
    }
}

pub struct TokenService {
    session: PurposeKeys,
    reset: PurposeKeys,
}

impl TokenService {
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        if secret.trim().is_empty() {
            return Err(TokenError::MissingSecret);
        }

        Ok(Self {
            session: PurposeKeys::derive(secret, Purpose::Session),
            reset: PurposeKeys::derive(secret, Purpose::Reset),
        })
    }

    fn keys(&self, purpose: Purpose) -> &PurposeKeys {
        match purpose {
            Purpose::Session => &self.session,
            Purpose::Reset => &self.reset,
        }
    }

    pub fn issue<P: Serialize>(&self, payload: &P, purpose: Purpose, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(payload, purpose, ttl, Utc::now())
    }

    /// Same as [`TokenService::issue`] with an explicit issue time.
    pub fn issue_at<P: Serialize>(
        &self,
        payload: &P,
        purpose: Purpose,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let iat = now.timestamp();
        let envelope = Envelope {
            payload,
            aud: purpose.as_str().to_string(),
            iat,
            exp: iat + ttl.as_secs() as i64,
        };

        encode(&Header::new(Algorithm::HS256), &envelope, &self.keys(purpose).encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn verify<P: DeserializeOwned>(&self, token: &str, expected: Purpose) -> Result<P, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_audience(&[expected.as_str()]);
        validation.set_required_spec_claims(&["exp", "aud"]);

        let data = decode::<Envelope<P>>(token, &self.keys(expected).decoding, &validation).map_err(|e| {
            debug!("Rejected {} token: {}", expected.as_str(), e);
            TokenError::InvalidToken
        })?;

        Ok(data.claims.payload)
    }

    pub fn issue_session(&self, user: &AuthenticatedUser) -> Result<String, TokenError> {
        self.issue(&SessionClaims::from(user), Purpose::Session, SESSION_TTL)
    }

    pub fn verify_session(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.verify(token, Purpose::Session)
    }

    pub fn issue_reset(&self, user_id: Uuid, password_hash: &str) -> Result<String, TokenError> {
        let claims = ResetClaims {
            sub: user_id,
            fingerprint: password_fingerprint(password_hash),
        };
        self.issue(&claims, Purpose::Reset, RESET_TTL)
    }

    pub fn verify_reset(&self, token: &str) -> Result<ResetClaims, TokenError> {
        self.verify(token, Purpose::Reset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret").unwrap()
    }

    fn user(role: Role) -> AuthenticatedUser {
        AuthenticatedUser {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            name: "Ada".to_string(),
            role,
            active: true,
        }
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(matches!(TokenService::new(""), Err(TokenError::MissingSecret)));
        assert!(matches!(TokenService::new("   "), Err(TokenError::MissingSecret)));
    }

    #[test]
    fn session_round_trip() {
        let tokens = service();
        let user = user(Role::Mentor);
        let token = tokens.issue_session(&user).unwrap();

        let claims = tokens.verify_session(&token).unwrap();
        assert_eq!(claims, SessionClaims::from(&user));
    }

    #[test]
    fn session_expires_after_seven_days() {
        let tokens = service();
        let claims = SessionClaims::from(&user(Role::Startup));

        let fresh = tokens
            .issue_at(&claims, Purpose::Session, SESSION_TTL, Utc::now() - chrono::Duration::days(6))
            .unwrap();
        assert!(tokens.verify_session(&fresh).is_ok());

        let stale = tokens
            .issue_at(&claims, Purpose::Session, SESSION_TTL, Utc::now() - chrono::Duration::days(8))
            .unwrap();
        assert!(matches!(tokens.verify_session(&stale), Err(TokenError::InvalidToken)));
    }

    #[test]
    fn reset_expires_after_one_hour() {
        let tokens = service();
        let claims = ResetClaims {
            sub: Uuid::new_v4(),
            fingerprint: password_fingerprint("hash"),
        };
        let stale = tokens
            .issue_at(&claims, Purpose::Reset, RESET_TTL, Utc::now() - chrono::Duration::minutes(61))
            .unwrap();
        assert!(matches!(tokens.verify_reset(&stale), Err(TokenError::InvalidToken)));
    }

    #[test]
    fn purposes_are_isolated() {
        let tokens = service();
        let user = user(Role::Admin);

        let reset = tokens.issue_reset(user.id, "hash").unwrap();
        assert!(matches!(tokens.verify_session(&reset), Err(TokenError::InvalidToken)));

        let session = tokens.issue_session(&user).unwrap();
        assert!(matches!(tokens.verify_reset(&session), Err(TokenError::InvalidToken)));
    }

    #[test]
    fn foreign_secret_and_tampering_are_rejected() {
        let tokens = service();
        let other = TokenService::new("another-secret").unwrap();
        let token = other.issue_session(&user(Role::Admin)).unwrap();
        assert!(tokens.verify_session(&token).is_err());

        let mut tampered = tokens.issue_session(&user(Role::Startup)).unwrap();
        tampered.push('x');
        assert!(tokens.verify_session(&tampered).is_err());
        assert!(tokens.verify_session("not.a.jwt").is_err());
    }

    #[test]
    fn reset_fingerprint_tracks_password_hash() {
        let tokens = service();
        let id = Uuid::new_v4();
        let token = tokens.issue_reset(id, "old-hash").unwrap();
        let claims = tokens.verify_reset(&token).unwrap();

        assert_eq!(claims.sub, id);
        assert!(claims.is_current_for("old-hash"));
        assert!(!claims.is_current_for("new-hash"));
    }
}
