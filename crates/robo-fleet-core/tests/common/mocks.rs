//! Mock collaborators and fixtures

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use robo_db::{CreateUser, MemoryStore, RobotRow, Store, UserRepository, UserRow};
use robo_fleet_core::generator::Generated;
use robo_fleet_core::{ledger, registry, FleetError, FleetPolicy, ReplyNotifier, ResponseGenerator};
use robo_types::{PlanType, Reply, RobotStatus};
use uuid::Uuid;

/// Generator that echoes the prompt and counts calls
#[derive(Default, Clone)]
pub struct MockGenerator {
    calls: Arc<DashMap<String, usize>>,
    fail: Arc<AtomicBool>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    #[allow(dead_code)]
    pub fn calls(&self, prompt: &str) -> usize {
        self.calls.get(prompt).map(|c| *c).unwrap_or(0)
    }
}

#[async_trait]
impl ResponseGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<Generated, FleetError> {
        *self.calls.entry(prompt.to_string()).or_insert(0) += 1;
        if self.fail.load(Ordering::SeqCst) {
            return Err(FleetError::Generation("generator offline".to_string()));
        }
        Ok(Generated {
            reply: Reply::new(format!("echo: {prompt}"), "happy"),
            cost: 12.0,
        })
    }
}

/// Notifier that records delivered replies
#[derive(Default, Clone)]
pub struct MockNotifier {
    delivered: Arc<DashMap<String, String>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mood delivered for a reply text
    #[allow(dead_code)]
    pub fn delivered(&self, reply: &str) -> Option<String> {
        self.delivered.get(reply).map(|m| m.value().clone())
    }
}

#[async_trait]
impl ReplyNotifier for MockNotifier {
    async fn notify(&self, reply: &Reply) -> Result<(), String> {
        self.delivered.insert(reply.reply.clone(), reply.mood.clone());
        Ok(())
    }
}

/// Insert a user with a given message count
pub async fn seed_user(store: &MemoryStore, messages_used: i64) -> UserRow {
    let mut tx = store.begin().await.unwrap();
    let user = tx
        .create_user(CreateUser {
            id: Uuid::new_v4(),
            name: "Alice".to_string(),
            email: format!("alice-{}@x.com", Uuid::new_v4()),
            password_hash: "hash".to_string(),
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();

    store
        .seed(|state| {
            if let Some(u) = state.users.iter_mut().find(|u| u.id == user.id) {
                u.messages_used = messages_used;
            }
        })
        .await;

    UserRow {
        messages_used,
        ..user
    }
}

/// Insert a robot with no plan
pub async fn seed_robot(store: &MemoryStore, owner: &UserRow, name: &str, status: RobotStatus) -> RobotRow {
    let mut tx = store.begin().await.unwrap();
    let robot = registry::create(tx.as_mut(), name, owner.user_id(), status)
        .await
        .unwrap();
    tx.commit().await.unwrap();
    robot
}

/// Insert an active robot holding a fresh plan
pub async fn seed_entitled_robot(store: &MemoryStore, owner: &UserRow, name: &str) -> RobotRow {
    let robot = seed_robot(store, owner, name, RobotStatus::Active).await;
    let mut tx = store.begin().await.unwrap();
    ledger::create_plan(
        tx.as_mut(),
        robot.robot_id(),
        owner.user_id(),
        PlanType::Basic,
        None,
        &FleetPolicy::default(),
        Utc::now(),
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();
    robot
}
