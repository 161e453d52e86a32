//! Common test utilities for robo-fleet-core integration tests

pub mod mocks;

#[allow(unused_imports)]
pub use mocks::{seed_entitled_robot, seed_robot, seed_user, MockGenerator, MockNotifier};
