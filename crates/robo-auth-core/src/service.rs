//! Auth service - registration, login and robot token issuance

use std::sync::Arc;

use chrono::{DateTime, Utc};
use robo_db::{CreateUser, DbError, Store, UserRepository};
use robo_fleet_core::{ledger, registry};
use robo_types::{RobotId, UserId};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::credentials::{validate_email, validate_name, validate_password, CredentialHasher};
use crate::token::{extract_bearer, TokenIssuer};
use crate::AuthError;

/// A freshly registered user
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A minted token and its expiry
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication service
pub struct AuthService {
    store: Arc<dyn Store>,
    tokens: TokenIssuer,
    hasher: Arc<dyn CredentialHasher>,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, tokens: TokenIssuer, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self {
            store,
            tokens,
            hasher,
        }
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Register a user with a bcrypt-hashed password
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisteredUser, AuthError> {
        let name = validate_name(name)?;
        let email = validate_email(email)?;
        validate_password(password)?;

        let password_hash = self.hasher.hash(password).await?;

        let mut tx = self.store.begin().await?;
        if tx.find_user_by_email(&email).await?.is_some() {
            return Err(AuthError::Conflict("email already registered".to_string()));
        }

        let user = tx
            .create_user(CreateUser {
                id: Uuid::new_v4(),
                name: name.to_string(),
                email,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                DbError::UniqueViolation(_) => {
                    AuthError::Conflict("email already registered".to_string())
                }
                other => other.into(),
            })?;
        tx.commit().await?;

        info!(user_id = %user.id, "User registered");
        Ok(RegisteredUser {
            id: user.user_id(),
            name: user.name,
            email: user.email,
            created_at: user.created_at,
        })
    }

    /// Exchange credentials for a user access token
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let email = email.trim().to_lowercase();

        let mut tx = self.store.begin().await?;
        let user = tx.find_user_by_email(&email).await?;
        drop(tx);

        let Some(user) = user else {
            warn!("Login for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &user.password_hash).await? {
            warn!(user_id = %user.id, "Login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let (token, expires_at) = self.tokens.issue_user_token(user.user_id(), Utc::now())?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Look up a user's public profile
    pub async fn profile(&self, user_id: UserId) -> Result<RegisteredUser, AuthError> {
        let mut tx = self.store.begin().await?;
        let user = tx
            .find_user_by_id(user_id.0)
            .await?
            .ok_or(AuthError::NotFound("user"))?;

        Ok(RegisteredUser {
            id: user.user_id(),
            name: user.name,
            email: user.email,
            created_at: user.created_at,
        })
    }

    /// Resolve the user behind an `Authorization` header value
    pub fn authenticate_user(&self, authorization: Option<&str>) -> Result<UserId, AuthError> {
        let token = extract_bearer(authorization)?;
        self.tokens.verify_user_token(token)
    }

    // =========================================================================
    // Robot tokens
    // =========================================================================

    /// Mint a robot token for one of `owner`'s robots.
    ///
    /// Requires a plan that has not expired; another owner's robot reads as
    /// not found.
    #[instrument(skip(self))]
    pub async fn generate_robot_token(
        &self,
        robot_id: RobotId,
        owner: UserId,
    ) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let robot = registry::find_by_owner_and_id(tx.as_mut(), robot_id, owner)
            .await?
            .ok_or(AuthError::NotFound("robot"))?;

        let plan = ledger::get_active_plan(tx.as_mut(), robot.robot_id())
            .await?
            .ok_or(AuthError::PaymentRequired)?;
        if plan.expired_at <= now {
            return Err(AuthError::PlanExpired);
        }
        drop(tx);

        let (token, expires_at) = self.tokens.issue_robot_token(robot.robot_id(), now)?;
        info!(robot_id = %robot.id, expires_at = %expires_at, "Robot token issued");
        Ok(IssuedToken { token, expires_at })
    }
}
