//! Configuration types for auth service

use crate::crypto::SigningKey;

/// Auth service configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 signing key shared by user and robot tokens
    pub signing_key: SigningKey,
    /// Lifetime of robot tokens
    pub robot_token_ttl: chrono::Duration,
    /// Lifetime of user access tokens
    pub user_token_ttl: chrono::Duration,
    /// bcrypt work factor
    pub bcrypt_cost: u32,
}

impl AuthConfig {
    /// Create a new auth config
    pub fn new(signing_key: SigningKey) -> Self {
        Self {
            signing_key,
            robot_token_ttl: chrono::Duration::days(30),
            user_token_ttl: chrono::Duration::hours(24),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Set robot token lifetime
    pub fn with_robot_token_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.robot_token_ttl = ttl;
        self
    }

    /// Set user token lifetime
    pub fn with_user_token_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.user_token_ttl = ttl;
        self
    }

    /// Set bcrypt cost
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }
}
