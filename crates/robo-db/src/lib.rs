//! Robo DB - Database abstractions
//!
//! SQLx-based persistence for the fleet services. Every read and write goes
//! through a [`StoreTx`], a transaction handle that implements all repository
//! traits. Dropping a handle without calling [`StoreTx::commit`] rolls it back.
//!
//! # Example
//!
//! ```rust,ignore
//! use robo_db::{create_pool, PgStore, Store, RobotRepository};
//!
//! let pool = create_pool("postgres://localhost/robo").await?;
//! let store = PgStore::new(pool);
//!
//! let mut tx = store.begin().await?;
//! let robot = tx.find_robot_by_name("bot1").await?;
//! tx.commit().await?;
//! ```

pub mod error;
#[cfg(feature = "memory")]
pub mod memory;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

pub use error::{DbError, DbResult};
#[cfg(feature = "memory")]
pub use memory::{MemoryState, MemoryStore};
pub use models::*;
pub use pg::{PgStore, PgStoreTx};
pub use pool::{create_pool, run_migrations, DbPool};
pub use repo::*;
