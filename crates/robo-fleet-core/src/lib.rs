//! Robo Fleet Core - Robot lifecycle and usage business logic
//!
//! - [`registry`]: robot creation, lookup and the entitlement window projection
//! - [`ledger`]: plans, subscriptions and the entitlement rule
//! - [`conversation`]: the quota-checked conversation step
//! - [`generator`] / [`notify`]: external collaborators used by conversations
//!
//! Registry and ledger functions take an open [`robo_db::StoreTx`] so callers
//! in other crates can compose them inside their own transactions.
//!
//! # Example
//!
//! ```rust,ignore
//! use robo_fleet_core::{ConversationService, FleetPolicy, OpenAiGenerator};
//!
//! let service = ConversationService::new(store, generator, notifier, FleetPolicy::default());
//! let reply = service.converse(robot_id, "Por que o céu é azul?").await?;
//! ```

pub mod config;
pub mod conversation;
pub mod error;
pub mod generator;
pub mod ledger;
pub mod notify;
pub mod registry;

pub use config::FleetPolicy;
pub use conversation::ConversationService;
pub use error::FleetError;
pub use generator::{OpenAiGenerator, ResponseGenerator, MOODS};
pub use notify::{HttpReplyNotifier, NoopNotifier, ReplyNotifier};
pub use registry::{RegistryService, RobotView};
