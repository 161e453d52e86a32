//! REST API handlers

pub mod auth;
pub mod conversation;
pub mod health;
pub mod payments;
pub mod robots;
pub mod shared;
pub mod webhook;

pub use auth::*;
pub use conversation::*;
pub use health::*;
pub use payments::*;
pub use robots::*;
pub use webhook::*;
