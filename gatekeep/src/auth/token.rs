//! Signed, time-limited access and refresh tokens.
//!
//! Tokens are HS256 JWTs carrying the username as subject and a type
//! discriminator. A token that decodes here is only authentic; whether it is
//! still usable is decided by the session store.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use super::models::TokenPair;

/// Lifetime of an access token (3 hours).
pub const ACCESS_TOKEN_TTL_SECS: i64 = 3 * 60 * 60;
/// Lifetime of a refresh token (1 day).
pub const REFRESH_TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    Invalid(String),

    #[error("Expected {expected} token, got {found}")]
    WrongType { expected: TokenType, found: TokenType },

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }

    fn ttl(&self) -> Duration {
        match self {
            TokenType::Access => Duration::seconds(ACCESS_TOKEN_TTL_SECS),
            TokenType::Refresh => Duration::seconds(REFRESH_TOKEN_TTL_SECS),
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Username
    pub sub: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Expiration (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Unique per token, so two tokens minted in the same second differ
    pub jti: String,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(signing_secret: &str) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(signing_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(signing_secret.as_bytes()),
            validation,
        }
    }

    pub fn create_access_token(&self, subject: &str) -> Result<String, TokenError> {
        self.encode_at(subject, TokenType::Access, Utc::now())
    }

    pub fn create_refresh_token(&self, subject: &str) -> Result<String, TokenError> {
        self.encode_at(subject, TokenType::Refresh, Utc::now())
    }

    pub fn create_token_pair(&self, subject: &str) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.create_access_token(subject)?,
            refresh_token: self.create_refresh_token(subject)?,
        })
    }

    /// Mint a token as if it had been issued at `issued_at`.
    pub(crate) fn encode_at(
        &self,
        subject: &str,
        token_type: TokenType,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: subject.to_string(),
            token_type,
            exp: (issued_at + token_type.ttl()).timestamp(),
            iat: issued_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify signature and expiry. The type discriminator is not checked.
    pub fn decode_token(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }

    pub fn decode_expecting(
        &self,
        token: &str,
        expected: TokenType,
    ) -> Result<Claims, TokenError> {
        let claims = self.decode_token(token)?;
        if claims.token_type != expected {
            return Err(TokenError::WrongType {
                expected,
                found: claims.token_type,
            });
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key";

    #[test]
    fn test_access_token_round_trip() {
        let codec = TokenCodec::new(SECRET);
        let before = Utc::now().timestamp();

        let token = codec.create_access_token("alice").unwrap();
        let claims = codec.decode_token(&token).unwrap();

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.token_type, TokenType::Access);
        let expected_exp = before + ACCESS_TOKEN_TTL_SECS;
        assert!((claims.exp - expected_exp).abs() <= 2);
    }

    #[test]
    fn test_refresh_token_expires_after_a_day() {
        let codec = TokenCodec::new(SECRET);
        let before = Utc::now().timestamp();

        let token = codec.create_refresh_token("alice").unwrap();
        let claims = codec.decode_token(&token).unwrap();

        assert_eq!(claims.token_type, TokenType::Refresh);
        assert!((claims.exp - (before + REFRESH_TOKEN_TTL_SECS)).abs() <= 2);
        assert!(claims.expires_at().is_some());
    }

    #[test]
    fn test_tokens_minted_together_are_distinct() {
        let codec = TokenCodec::new(SECRET);

        let first = codec.create_refresh_token("alice").unwrap();
        let second = codec.create_refresh_token("alice").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_expired_token() {
        let codec = TokenCodec::new(SECRET);
        let issued_at = Utc::now() - Duration::hours(4);

        let token = codec.encode_at("alice", TokenType::Access, issued_at).unwrap();

        assert_eq!(codec.decode_token(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = TokenCodec::new("secret1").create_access_token("alice").unwrap();
        let result = TokenCodec::new("secret2").decode_token(&token);

        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_malformed_token_is_invalid() {
        let codec = TokenCodec::new(SECRET);

        assert!(matches!(
            codec.decode_token("invalid.token.here"),
            Err(TokenError::Invalid(_))
        ));
        assert!(matches!(codec.decode_token(""), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_unsupported_algorithm_is_invalid() {
        let codec = TokenCodec::new(SECRET);
        let claims = Claims {
            sub: "alice".to_string(),
            token_type: TokenType::Access,
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            iat: Utc::now().timestamp(),
            jti: "jti".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(codec.decode_token(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_decode_expecting_checks_type() {
        let codec = TokenCodec::new(SECRET);
        let pair = codec.create_token_pair("alice").unwrap();

        assert!(codec.decode_expecting(&pair.access_token, TokenType::Access).is_ok());
        assert!(codec.decode_expecting(&pair.refresh_token, TokenType::Refresh).is_ok());
        assert_eq!(
            codec.decode_expecting(&pair.refresh_token, TokenType::Access),
            Err(TokenError::WrongType {
                expected: TokenType::Access,
                found: TokenType::Refresh,
            })
        );
    }
}
