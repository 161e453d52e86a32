//! Common test utilities for robo-billing-core integration tests

pub mod mocks;

#[allow(unused_imports)]
pub use mocks::{
    billing_config, checkout_completed, event, invoice_event, seed_user, subscription_event,
    MockProvider,
};
