//! Robo Auth Core - Authentication and access control
//!
//! Bearer tokens for users and robots, password credentials, and the gate
//! that decides whether a robot may use the conversation endpoint.

pub mod config;
pub mod credentials;
pub mod crypto;
pub mod error;
pub mod gate;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use credentials::{BcryptHasher, CredentialHasher};
pub use crypto::{SigningKey, SigningKeyError};
pub use error::AuthError;
pub use gate::{AccessGate, RobotAccess};
pub use service::{AuthService, IssuedToken, RegisteredUser};
pub use token::{extract_bearer, RobotClaims, TokenIssuer, UserClaims};
