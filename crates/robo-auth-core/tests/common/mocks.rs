//! Fast credential hasher and store fixtures

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use robo_auth_core::{AuthConfig, AuthError, CredentialHasher, SigningKey, TokenIssuer};
use robo_db::{
    CreatePlan, CreateRobot, CreateUser, MemoryStore, PlanRepository, RobotRepository, RobotRow,
    Store, UserRepository, UserRow,
};
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret-with-32-bytes!";

pub fn issuer() -> TokenIssuer {
    TokenIssuer::new(AuthConfig::new(SigningKey::new(TEST_SECRET).unwrap()))
}

/// Hasher that stores an opaque handle per password
#[derive(Default, Clone)]
pub struct MockHasher {
    hashes: Arc<DashMap<String, String>>,
}

impl MockHasher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialHasher for MockHasher {
    async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let handle = format!("mock${}", Uuid::new_v4());
        self.hashes.insert(handle.clone(), password.to_string());
        Ok(handle)
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        Ok(self.hashes.get(hash).is_some_and(|p| p.value() == password))
    }
}

/// Insert a user
pub async fn seed_owner(store: &MemoryStore) -> UserRow {
    let mut tx = store.begin().await.unwrap();
    let user = tx
        .create_user(CreateUser {
            id: Uuid::new_v4(),
            name: "Alice".to_string(),
            email: format!("{}@x.com", Uuid::new_v4()),
            password_hash: "unused".to_string(),
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();
    user
}

/// Insert a robot in `status`, optionally with a plan expiring at `plan_expiry`
pub async fn seed_robot_with_plan(
    store: &MemoryStore,
    owner: &UserRow,
    name: &str,
    status: &str,
    plan_expiry: Option<DateTime<Utc>>,
) -> RobotRow {
    let mut tx = store.begin().await.unwrap();
    let robot = tx
        .create_robot(CreateRobot {
            id: Uuid::new_v4(),
            name: name.to_string(),
            user_id: owner.id,
            status: status.to_string(),
            activated_at: Some(Utc::now()),
        })
        .await
        .unwrap();
    if let Some(expired_at) = plan_expiry {
        tx.create_plan(CreatePlan {
            id: Uuid::new_v4(),
            user_id: owner.id,
            robot_id: robot.id,
            plan_type: "basic".to_string(),
            initiated_at: expired_at - chrono::Duration::days(30),
            expired_at,
            payment_id: None,
        })
        .await
        .unwrap();
        tx.set_plan_valid_until(robot.id, Some(expired_at)).await.unwrap();
    }
    tx.commit().await.unwrap();
    robot
}
