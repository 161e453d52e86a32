//! Common test utilities for robo-auth-core integration tests

pub mod mocks;

#[allow(unused_imports)]
pub use mocks::{issuer, seed_owner, seed_robot_with_plan, MockHasher, TEST_SECRET};
