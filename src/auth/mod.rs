use async_trait::async_trait;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AuthConfig;

/// Access-token claims issued by the hosted auth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: Option<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            email,
            role: Some("authenticated".to_string()),
            aud: Some("authenticated".to_string()),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Authenticated identity for one request.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: Option<String>,
    /// Raw bearer token, forwarded to downstream calls made on the user's behalf.
    pub access_token: String,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Missing Authorization header")]
    MissingHeader,

    #[error("{0}")]
    InvalidHeader(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("JWT secret not configured")]
    NotConfigured,
}

/// Resolves the caller's session from request headers.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Session, SessionError>;
}

/// Validates HS256 access tokens signed with the project's JWT secret.
pub struct JwtSessionResolver {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtSessionResolver {
    pub fn new(secret: &str, audience: Option<&str>) -> Result<Self, SessionError> {
        if secret.is_empty() {
            return Err(SessionError::NotConfigured);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, SessionError> {
        Self::new(&config.jwt_secret, config.jwt_audience.as_deref())
    }

    pub fn validate(&self, token: &str) -> Result<Claims, SessionError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}

#[async_trait]
impl SessionResolver for JwtSessionResolver {
    async fn resolve(&self, headers: &HeaderMap) -> Result<Session, SessionError> {
        let token = extract_bearer_token(headers)?;
        let claims = self.validate(&token)?;
        Ok(Session {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            access_token: token,
        })
    }
}

/// Extract the bearer token from the Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, SessionError> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(SessionError::MissingHeader)?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| SessionError::InvalidHeader("Invalid Authorization header format".to_string()))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err(SessionError::InvalidHeader("Empty JWT token".to_string())),
        None => Err(SessionError::InvalidHeader(
            "Authorization header must use Bearer token format".to_string(),
        )),
    }
}

/// Sign `claims` with `secret`. Used by tests and local tooling to mint access tokens.
pub fn issue_token(claims: &Claims, secret: &str) -> Result<String, SessionError> {
    if secret.is_empty() {
        return Err(SessionError::NotConfigured);
    }
    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    Ok(encode(&Header::new(Algorithm::HS256), claims, &encoding_key)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "unit-test-secret";

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[tokio::test]
    async fn resolves_session_from_valid_token() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, Some("kit@example.com".into()), Duration::hours(1));
        let token = issue_token(&claims, SECRET).unwrap();

        let resolver = JwtSessionResolver::new(SECRET, Some("authenticated")).unwrap();
        let session = resolver.resolve(&headers_with(&format!("Bearer {}", token))).await.unwrap();
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.email.as_deref(), Some("kit@example.com"));
        assert_eq!(session.access_token, token);
    }

    #[tokio::test]
    async fn rejects_expired_wrong_secret_and_wrong_audience() {
        let user_id = Uuid::new_v4();
        let resolver = JwtSessionResolver::new(SECRET, Some("authenticated")).unwrap();

        let expired = issue_token(&Claims::new(user_id, None, Duration::hours(-2)), SECRET).unwrap();
        assert!(resolver.resolve(&headers_with(&format!("Bearer {}", expired))).await.is_err());

        let forged = issue_token(&Claims::new(user_id, None, Duration::hours(1)), "other-secret").unwrap();
        assert!(resolver.resolve(&headers_with(&format!("Bearer {}", forged))).await.is_err());

        let mut claims = Claims::new(user_id, None, Duration::hours(1));
        claims.aud = Some("service_role".into());
        let token = issue_token(&claims, SECRET).unwrap();
        assert!(resolver.resolve(&headers_with(&format!("Bearer {}", token))).await.is_err());
    }

    #[test]
    fn bearer_extraction() {
        assert!(matches!(extract_bearer_token(&HeaderMap::new()), Err(SessionError::MissingHeader)));
        assert!(extract_bearer_token(&headers_with("Basic abc")).is_err());
        assert!(extract_bearer_token(&headers_with("Bearer   ")).is_err());
        assert_eq!(extract_bearer_token(&headers_with("Bearer abc")).unwrap(), "abc");
    }

    #[test]
    fn empty_secret_is_not_configured() {
        assert!(matches!(JwtSessionResolver::new("", None), Err(SessionError::NotConfigured)));
    }
}
