//! Robot registry
//!
//! Robot creation, lookup and status changes. [`set_status`] is the only
//! function that changes a robot's status; the payment engine calls it when
//! payments settle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use robo_db::{
    CreateRobot, DbError, PlanRepository, PlanRow, RobotRepository, RobotRow, Store, StoreTx,
};
use robo_types::{PlanType, RobotId, RobotStatus, UserId};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::config::MAX_ROBOT_NAME_CHARS;
use crate::error::FleetError;

/// Robot as presented to its owner.
///
/// `plan_valid_until` is always recomputed from the robot's plans, never
/// read from the cached column.
#[derive(Debug, Clone, Serialize)]
pub struct RobotView {
    pub id: RobotId,
    pub name: String,
    pub owner_id: UserId,
    pub status: RobotStatus,
    pub activated_at: Option<DateTime<Utc>>,
    pub plan_valid_until: Option<DateTime<Utc>>,
    pub last_ping: Option<DateTime<Utc>>,
    /// Tiers of the robot's active plans
    pub plans: Vec<PlanType>,
    pub created_at: DateTime<Utc>,
}

/// Trim and check a robot name
pub fn validate_robot_name(name: &str) -> Result<&str, FleetError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FleetError::InvalidArgument(
            "robot name must not be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_ROBOT_NAME_CHARS {
        return Err(FleetError::InvalidArgument(format!(
            "robot name must be at most {MAX_ROBOT_NAME_CHARS} characters"
        )));
    }
    Ok(name)
}

/// Latest expiry over the active plans, if any
pub fn recompute_entitlement_window(plans: &[PlanRow]) -> Option<DateTime<Utc>> {
    plans
        .iter()
        .filter(|p| p.active)
        .map(|p| p.expired_at)
        .max()
}

/// Register a robot under `owner`.
///
/// Robots created directly start `pending`; the payment engine creates them
/// `active` once their checkout settles.
#[instrument(skip(tx))]
pub async fn create(
    tx: &mut dyn StoreTx,
    name: &str,
    owner: UserId,
    status: RobotStatus,
) -> Result<RobotRow, FleetError> {
    let name = validate_robot_name(name)?;

    if tx.find_robot_by_name(name).await?.is_some() {
        return Err(FleetError::Conflict(format!("robot '{name}' already exists")));
    }

    let activated_at = (status == RobotStatus::Active).then(Utc::now);
    let robot = tx
        .create_robot(CreateRobot {
            id: RobotId::new().0,
            name: name.to_string(),
            user_id: owner.0,
            status: status.as_str().to_string(),
            activated_at,
        })
        .await
        .map_err(|e| match e {
            DbError::UniqueViolation(_) => {
                FleetError::Conflict(format!("robot '{name}' already exists"))
            }
            other => other.into(),
        })?;

    info!(robot_id = %robot.id, name = %robot.name, status = %status, "Robot registered");
    Ok(robot)
}

/// Find a robot by its unique name
pub async fn find_by_name(tx: &mut dyn StoreTx, name: &str) -> Result<Option<RobotRow>, FleetError> {
    Ok(tx.find_robot_by_name(name.trim()).await?)
}

/// Find a robot owned by `owner`. Another owner's robot reads as absent.
pub async fn find_by_owner_and_id(
    tx: &mut dyn StoreTx,
    id: RobotId,
    owner: UserId,
) -> Result<Option<RobotRow>, FleetError> {
    Ok(tx.find_robot_by_owner_and_id(id.0, owner.0).await?)
}

/// Change a robot's status
#[instrument(skip(tx))]
pub async fn set_status(
    tx: &mut dyn StoreTx,
    id: RobotId,
    status: RobotStatus,
) -> Result<(), FleetError> {
    tx.set_robot_status(id.0, status.as_str()).await?;
    debug!(robot_id = %id, status = %status, "Robot status changed");
    Ok(())
}

/// Build the owner-facing view of a robot
pub async fn view(tx: &mut dyn StoreTx, robot: RobotRow) -> Result<RobotView, FleetError> {
    let plans = tx.list_plans_by_robot(robot.id).await?;

    Ok(RobotView {
        id: robot.robot_id(),
        owner_id: robot.owner_id(),
        status: robot.status(),
        plan_valid_until: recompute_entitlement_window(&plans),
        plans: plans
            .iter()
            .filter(|p| p.active)
            .map(PlanRow::plan_type)
            .collect(),
        name: robot.name,
        activated_at: robot.activated_at,
        last_ping: robot.last_ping,
        created_at: robot.created_at,
    })
}

/// Read-side registry operations for the HTTP layer
#[derive(Clone)]
pub struct RegistryService {
    store: Arc<dyn Store>,
}

impl RegistryService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Register a robot in `pending` state
    pub async fn create(&self, name: &str, owner: UserId) -> Result<RobotRow, FleetError> {
        let mut tx = self.store.begin().await?;
        let robot = create(tx.as_mut(), name, owner, RobotStatus::Pending).await?;
        tx.commit().await?;
        Ok(robot)
    }

    /// All robots owned by `owner`, oldest first
    #[instrument(skip(self))]
    pub async fn list_for_owner(&self, owner: UserId) -> Result<Vec<RobotView>, FleetError> {
        let mut tx = self.store.begin().await?;
        let robots = tx.list_robots_by_owner(owner.0).await?;

        let mut views = Vec::with_capacity(robots.len());
        for robot in robots {
            views.push(view(tx.as_mut(), robot).await?);
        }
        Ok(views)
    }

    /// Look up one of `owner`'s robots by name
    #[instrument(skip(self))]
    pub async fn find_for_owner(&self, owner: UserId, name: &str) -> Result<RobotView, FleetError> {
        let mut tx = self.store.begin().await?;
        let robot = find_by_name(tx.as_mut(), name)
            .await?
            .filter(|r| r.user_id == owner.0)
            .ok_or(FleetError::NotFound("robot"))?;

        view(tx.as_mut(), robot).await
    }
}
