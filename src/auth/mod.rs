pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::database::models::user::{Role, User};

pub use password::{hash_password, validate_password_strength, verify_password, PasswordError};

crate::text_enum! {
    /// Access tokens authorize API calls; refresh tokens only mint new pairs
    pub enum TokenKind {
        Access => "access",
        Refresh => "refresh",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub kind: TokenKind,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user: &User, kind: TokenKind, security: &SecurityConfig) -> Self {
        let now = Utc::now();
        let lifetime = match kind {
            TokenKind::Access => Duration::hours(security.jwt_expiry_hours as i64),
            TokenKind::Refresh => Duration::days(security.refresh_expiry_days as i64),
        };

        Self {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            kind,
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT secret")]
    InvalidSecret,
    #[error("JWT has expired")]
    Expired,
    #[error("JWT kind mismatch")]
    WrongKind,
    #[error("Invalid JWT: {0}")]
    Invalid(String),
}

/// Access/refresh pair returned by login, register and refresh
#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

impl TokenPair {
    pub fn issue(user: &User, security: &SecurityConfig) -> Result<Self, JwtError> {
        Ok(Self {
            access_token: issue_token(user, TokenKind::Access, security)?,
            refresh_token: issue_token(user, TokenKind::Refresh, security)?,
            token_type: "Bearer",
            expires_in: security.jwt_expiry_hours * 3600,
        })
    }
}

pub fn issue_token(user: &User, kind: TokenKind, security: &SecurityConfig) -> Result<String, JwtError> {
    encode_claims(&Claims::new(user, kind, security), security)
}

pub fn encode_claims(claims: &Claims, security: &SecurityConfig) -> Result<String, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());
    encode(&Header::new(Algorithm::HS256), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Validate signature and expiry, then require the expected token kind
pub fn verify_token(token: &str, expected: TokenKind, security: &SecurityConfig) -> Result<Claims, JwtError> {
    if security.jwt_secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    let claims = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            _ => JwtError::Invalid(e.to_string()),
        })?
        .claims;

    if claims.kind != expected {
        return Err(JwtError::WrongKind);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn security() -> SecurityConfig {
        AppConfig::development().security
    }

    fn user(role: Role) -> User {
        User::fixture("ada@example.edu", role)
    }

    #[test]
    fn access_token_round_trips() {
        let security = security();
        let user = user(Role::Librarian);
        let token = issue_token(&user, TokenKind::Access, &security).unwrap();
        let claims = verify_token(&token, TokenKind::Access, &security).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Librarian);
        assert_eq!(claims.email, "ada@example.edu");
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let security = security();
        let token = issue_token(&user(Role::Student), TokenKind::Refresh, &security).unwrap();
        assert!(matches!(
            verify_token(&token, TokenKind::Access, &security),
            Err(JwtError::WrongKind)
        ));
        assert!(verify_token(&token, TokenKind::Refresh, &security).is_ok());
    }

    #[test]
    fn expired_token_is_rejected() {
        let security = security();
        let mut claims = Claims::new(&user(Role::Student), TokenKind::Access, &security);
        claims.iat -= 7200;
        claims.exp = Utc::now().timestamp() - 3600;
        let token = encode_claims(&claims, &security).unwrap();
        assert!(matches!(
            verify_token(&token, TokenKind::Access, &security),
            Err(JwtError::Expired)
        ));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let security = security();
        let mut other = security.clone();
        other.jwt_secret = "someone-elses-secret".to_string();
        let token = issue_token(&user(Role::Admin), TokenKind::Access, &other).unwrap();
        assert!(matches!(
            verify_token(&token, TokenKind::Access, &security),
            Err(JwtError::Invalid(_))
        ));
    }

    #[test]
    fn empty_secret_cannot_sign() {
        let mut security = security();
        security.jwt_secret.clear();
        assert!(matches!(
            issue_token(&user(Role::Admin), TokenKind::Access, &security),
            Err(JwtError::InvalidSecret)
        ));
    }

    #[test]
    fn token_pair_reports_access_lifetime() {
        let security = security();
        let pair = TokenPair::issue(&user(Role::Student), &security).unwrap();
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, security.jwt_expiry_hours * 3600);
        assert_ne!(pair.access_token, pair.refresh_token);
    }
}
