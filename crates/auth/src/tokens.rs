//! Signed token issuance and verification.
//!
//! RS256 with PEM key files is the production mode; HS256 with a shared
//! secret exists for local development and tests.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use stockroom_core::Entity;

use crate::claims::{validate_claims, JwtClaims, TokenUse, TokenValidationError};
use crate::User;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenConfig {
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            issuer: "stockroom".to_string(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
        }
    }
}

/// Response body of login/refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to read key file {path}: {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid signing key: {0}")]
    Key(String),

    #[error("failed to sign token: {0}")]
    Signing(String),

    #[error("token has expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("expected a {expected} token, got a {actual} token")]
    WrongUse { expected: TokenUse, actual: TokenUse },

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

#[derive(Clone)]
pub struct TokenService {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    config: TokenConfig,
}

impl core::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &self.algorithm)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn rsa_from_pem(
        private_pem: &[u8],
        public_pem: &[u8],
        config: TokenConfig,
    ) -> Result<Self, TokenError> {
        let encoding =
            EncodingKey::from_rsa_pem(private_pem).map_err(|e| TokenError::Key(e.to_string()))?;
        let decoding =
            DecodingKey::from_rsa_pem(public_pem).map_err(|e| TokenError::Key(e.to_string()))?;
        Ok(Self {
            algorithm: Algorithm::RS256,
            encoding,
            decoding,
            config,
        })
    }

    pub fn rsa_from_files(
        private_path: impl AsRef<Path>,
        public_path: impl AsRef<Path>,
        config: TokenConfig,
    ) -> Result<Self, TokenError> {
        let private_pem = read_key(private_path.as_ref())?;
        let public_pem = read_key(public_path.as_ref())?;
        Self::rsa_from_pem(&private_pem, &public_pem, config)
    }

    pub fn hmac(secret: &[u8], config: TokenConfig) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            config,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn issue_pair(&self, user: &User, now: DateTime<Utc>) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue(user, TokenUse::Access, now)?,
            refresh_token: self.issue(user, TokenUse::Refresh, now)?,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_ttl.num_seconds(),
        })
    }

    fn issue(&self, user: &User, token_use: TokenUse, now: DateTime<Utc>) -> Result<String, TokenError> {
        let ttl = match token_use {
            TokenUse::Access => self.config.access_ttl,
            TokenUse::Refresh => self.config.refresh_ttl,
        };
        let claims = JwtClaims {
            sub: user.id(),
            username: user.username().to_string(),
            roles: user.roles().to_vec(),
            token_use,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::now_v7(),
            iss: self.config.issuer.clone(),
        };
        encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature, issuer and expiry, then the token use and the claim
    /// time window against `now`.
    pub fn validate(
        &self,
        token: &str,
        expected: TokenUse,
        now: DateTime<Utc>,
    ) -> Result<JwtClaims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_issuer(&[self.config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);

        let data = decode::<JwtClaims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            }
        })?;
        let claims = data.claims;

        if claims.token_use != expected {
            return Err(TokenError::WrongUse {
                expected,
                actual: claims.token_use,
            });
        }
        validate_claims(&claims, now)?;
        Ok(claims)
    }
}

fn read_key(path: &Path) -> Result<Vec<u8>, TokenError> {
    std::fs::read(path).map_err(|source| TokenError::KeyFile {
        path: path.display().to_string(),
        source,
    })
}
