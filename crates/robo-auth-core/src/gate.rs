//! Access control gate for robot requests
//!
//! Two checks, both required:
//! 1. the bearer token verifies and names a robot
//! 2. that robot is entitled right now, judged from the store and not from
//!    anything in the token

use std::sync::Arc;

use chrono::Utc;
use robo_db::{RobotRepository, RobotRow, Store, SubscriptionRow};
use robo_fleet_core::ledger;
use robo_types::RobotId;
use tracing::{debug, instrument};

use crate::token::{extract_bearer, TokenIssuer};
use crate::AuthError;

/// An authorized robot, attached to the request for downstream handlers
#[derive(Debug, Clone)]
pub struct RobotAccess {
    pub robot: RobotRow,
    /// Active subscription, when the robot is entitled through one
    pub subscription: Option<SubscriptionRow>,
}

impl RobotAccess {
    pub fn robot_id(&self) -> RobotId {
        self.robot.robot_id()
    }
}

/// Verifies robot tokens and entitlement
#[derive(Clone)]
pub struct AccessGate {
    store: Arc<dyn Store>,
    tokens: TokenIssuer,
}

impl AccessGate {
    pub fn new(store: Arc<dyn Store>, tokens: TokenIssuer) -> Self {
        Self { store, tokens }
    }

    /// Authorize a request from its `Authorization` header value
    #[instrument(skip_all)]
    pub async fn authorize(&self, authorization: Option<&str>) -> Result<RobotAccess, AuthError> {
        let token = extract_bearer(authorization)?;
        let robot_id = self.tokens.verify_robot_token(token)?;
        self.check(robot_id).await
    }

    /// Entitlement check for an already identified robot
    pub async fn check(&self, robot_id: RobotId) -> Result<RobotAccess, AuthError> {
        let mut tx = self.store.begin().await?;

        let robot = tx
            .find_robot_by_id(robot_id.0)
            .await?
            .ok_or(AuthError::NotFound("robot"))?;

        let entitlement = ledger::check_entitlement(tx.as_mut(), &robot, Utc::now()).await?;
        debug!(robot_id = %robot.id, subscribed = entitlement.subscription.is_some(), "Robot authorized");

        Ok(RobotAccess {
            robot,
            subscription: entitlement.subscription,
        })
    }
}
