//! HS256 bearer tokens
//!
//! Robot tokens carry `{robot_id, iat, exp}` and user tokens carry
//! `{user_id, iat, exp}`. Each kind fails to decode as the other because the
//! identity claim is required.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
use robo_types::{RobotId, UserId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AuthConfig;
use crate::AuthError;

/// Claims of a robot token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotClaims {
    pub robot_id: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims of a user access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub user_id: String,
    pub iat: i64,
    pub exp: i64,
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn extract_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::InvalidToken)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidToken)?
        .trim();
    if token.is_empty() {
        return Err(AuthError::InvalidToken);
    }
    Ok(token)
}

/// Mints and verifies tokens with the process signing key
#[derive(Clone)]
pub struct TokenIssuer {
    config: AuthConfig,
    validation: Validation,
}

impl TokenIssuer {
    pub fn new(config: AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        Self { config, validation }
    }

    /// Mint a robot token valid for the configured robot lifetime
    pub fn issue_robot_token(
        &self,
        robot_id: RobotId,
        now: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        let expires_at = now + self.config.robot_token_ttl;
        let claims = RobotClaims {
            robot_id: robot_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        Ok((self.sign(&claims)?, expires_at))
    }

    /// Mint a user access token valid for the configured user lifetime
    pub fn issue_user_token(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        let expires_at = now + self.config.user_token_ttl;
        let claims = UserClaims {
            user_id: user_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        Ok((self.sign(&claims)?, expires_at))
    }

    /// Verify a robot token and return the robot it names
    pub fn verify_robot_token(&self, token: &str) -> Result<RobotId, AuthError> {
        let claims: RobotClaims = self.verify(token)?;
        RobotId::parse(&claims.robot_id).map_err(|_| {
            debug!("Token robot_id is not a valid identifier");
            AuthError::InvalidToken
        })
    }

    /// Verify a user token and return the user it names
    pub fn verify_user_token(&self, token: &str) -> Result<UserId, AuthError> {
        let claims: UserClaims = self.verify(token)?;
        UserId::parse(&claims.user_id).map_err(|_| {
            debug!("Token user_id is not a valid identifier");
            AuthError::InvalidToken
        })
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.config.signing_key.encoding_key(),
        )
        .map_err(|e| AuthError::Internal(format!("token signing failed: {e}")))
    }

    fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, AuthError> {
        decode::<T>(token, &self.config.signing_key.decoding_key(), &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                // Expiry is reported like any other rejection
                debug!("Token rejected: {}", e);
                AuthError::InvalidToken
            })
    }
}
