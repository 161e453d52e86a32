//! Robo Types - Shared domain types
//!
//! This crate contains domain types used across the fleet services:
//! - User and robot identity
//! - Plan tiers and pricing
//! - Subscription and payment states
//! - Conversation replies

pub mod conversation;
pub mod error;
pub mod payment;
pub mod plan;
pub mod robot;
pub mod subscription;
pub mod user;

pub use conversation::*;
pub use error::*;
pub use payment::*;
pub use plan::*;
pub use robot::*;
pub use subscription::*;
pub use user::*;
