//! Common test utilities for robo-api router tests

pub mod mocks;

#[allow(unused_imports)]
pub use mocks::{
    checkout_completed_payload, signed_webhook, MockGenerator, MockHasher, MockProvider, RecordingNotifier, TestApp,
    TEST_SECRET, WEBHOOK_SECRET,
};
