//! Plan and subscription ledger
//!
//! Plans are fixed-length grants created when a checkout settles.
//! Subscriptions mirror the payment provider's recurring subscriptions and
//! are always joined on the provider subscription ID.
//!
//! A robot is entitled when its status is `active` and it has either an
//! active subscription or an unexpired plan window.

use chrono::{DateTime, Utc};
use robo_db::{
    CreatePlan, CreateSubscription, PlanRepository, PlanRow, RobotRepository, RobotRow, StoreTx,
    SubscriptionRepository, SubscriptionRow, SubscriptionStateUpdate,
};
use robo_types::{PlanType, RobotId, RobotStatus, SubscriptionStatus, UserId};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::FleetPolicy;
use crate::error::FleetError;
use crate::registry::recompute_entitlement_window;

// =============================================================================
// Pure rules
// =============================================================================

/// Active means status `active` and `start <= now < end`
pub fn is_subscription_active(sub: &SubscriptionRow, now: DateTime<Utc>) -> bool {
    period_contains(
        sub.status(),
        sub.current_period_start,
        sub.current_period_end,
        now,
    )
}

/// Half-open period check shared by subscription rows and tests
pub fn period_contains(
    status: SubscriptionStatus,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    status == SubscriptionStatus::Active && start <= now && now < end
}

/// Whether a subscription is inside its renewal lead window
pub fn should_renew(sub: &SubscriptionRow, now: DateTime<Utc>, lead: chrono::Duration) -> bool {
    is_subscription_active(sub, now)
        && !sub.cancel_at_period_end
        && now > sub.current_period_end - lead
}

/// Entitlement rule: status first, then subscription or plan window
pub fn is_entitled(
    status: RobotStatus,
    has_active_subscription: bool,
    plan_valid_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    if status != RobotStatus::Active {
        return false;
    }
    has_active_subscription || plan_valid_until.is_some_and(|until| until > now)
}

// =============================================================================
// Entitlement
// =============================================================================

/// What currently entitles a robot
#[derive(Debug, Clone)]
pub struct Entitlement {
    /// Active subscription, if one exists
    pub subscription: Option<SubscriptionRow>,
    /// Recomputed plan window
    pub plan_valid_until: Option<DateTime<Utc>>,
}

/// Check a robot's entitlement against current state
pub async fn check_entitlement(
    tx: &mut dyn StoreTx,
    robot: &RobotRow,
    now: DateTime<Utc>,
) -> Result<Entitlement, FleetError> {
    if robot.status() != RobotStatus::Active {
        debug!(robot_id = %robot.id, status = %robot.status, "Robot not active");
        return Err(FleetError::PaymentRequired);
    }

    let subscription = tx.find_active_subscription(robot.id, now).await?;
    let plans = tx.list_plans_by_robot(robot.id).await?;
    let plan_valid_until = recompute_entitlement_window(&plans);

    if !is_entitled(robot.status(), subscription.is_some(), plan_valid_until, now) {
        debug!(robot_id = %robot.id, "Robot has no current plan or subscription");
        return Err(FleetError::PaymentRequired);
    }

    Ok(Entitlement {
        subscription,
        plan_valid_until,
    })
}

// =============================================================================
// Plans
// =============================================================================

/// Currently active plan of a robot
pub async fn get_active_plan(
    tx: &mut dyn StoreTx,
    robot_id: RobotId,
) -> Result<Option<PlanRow>, FleetError> {
    Ok(tx.find_active_plan(robot_id.0).await?)
}

/// Grant a plan.
///
/// A robot that already holds an unexpired active plan keeps it and nothing
/// changes. Otherwise earlier plans are deactivated, a new one starts now and
/// the cached window on the robot is refreshed.
#[instrument(skip(tx, policy))]
pub async fn create_plan(
    tx: &mut dyn StoreTx,
    robot_id: RobotId,
    user_id: UserId,
    plan_type: PlanType,
    payment_id: Option<String>,
    policy: &FleetPolicy,
    now: DateTime<Utc>,
) -> Result<PlanRow, FleetError> {
    if let Some(existing) = tx.find_active_plan(robot_id.0).await? {
        if existing.expired_at > now {
            debug!(plan_id = %existing.id, "Robot already has an active plan");
            return Ok(existing);
        }
    }

    tx.deactivate_plans(robot_id.0).await?;
    let plan = tx
        .create_plan(CreatePlan {
            id: Uuid::new_v4(),
            user_id: user_id.0,
            robot_id: robot_id.0,
            plan_type: plan_type.as_str().to_string(),
            initiated_at: now,
            expired_at: now + policy.plan_duration,
            payment_id,
        })
        .await?;

    refresh_entitlement_window(tx, robot_id).await?;
    info!(plan_id = %plan.id, expires_at = %plan.expired_at, "Plan created");
    Ok(plan)
}

/// Recompute the robot's window from its plans and store it in the cache column
pub async fn refresh_entitlement_window(
    tx: &mut dyn StoreTx,
    robot_id: RobotId,
) -> Result<Option<DateTime<Utc>>, FleetError> {
    let plans = tx.list_plans_by_robot(robot_id.0).await?;
    let window = recompute_entitlement_window(&plans);
    tx.set_plan_valid_until(robot_id.0, window).await?;
    Ok(window)
}

// =============================================================================
// Subscriptions
// =============================================================================

/// Active subscription of a robot at `now`
pub async fn find_active_subscription(
    tx: &mut dyn StoreTx,
    robot_id: RobotId,
    now: DateTime<Utc>,
) -> Result<Option<SubscriptionRow>, FleetError> {
    Ok(tx.find_active_subscription(robot_id.0, now).await?)
}

/// Provider-side identity and billing window of a subscription
#[derive(Debug, Clone)]
pub struct ProviderSubscription {
    pub provider_subscription_id: String,
    pub provider_customer_id: Option<String>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

/// Create or refresh the local mirror of a provider subscription
#[instrument(skip(tx, provider), fields(provider_subscription_id = %provider.provider_subscription_id))]
pub async fn upsert_subscription_from_provider(
    tx: &mut dyn StoreTx,
    provider: &ProviderSubscription,
    user_id: UserId,
    robot_id: RobotId,
    plan_type: PlanType,
) -> Result<SubscriptionRow, FleetError> {
    if let Some(existing) = tx
        .find_subscription_by_provider_id(&provider.provider_subscription_id)
        .await?
    {
        tx.update_subscription_state(
            existing.id,
            SubscriptionStateUpdate {
                status: SubscriptionStatus::Active.as_str().to_string(),
                current_period_start: provider.period_start,
                current_period_end: provider.period_end,
                cancel_at_period_end: existing.cancel_at_period_end,
                canceled_at: existing.canceled_at,
            },
        )
        .await?;
        debug!(subscription_id = %existing.id, "Subscription refreshed");

        return tx
            .find_subscription_by_id(existing.id)
            .await?
            .ok_or(FleetError::NotFound("subscription"));
    }

    let sub = tx
        .create_subscription(CreateSubscription {
            id: Uuid::new_v4(),
            user_id: user_id.0,
            robot_id: robot_id.0,
            plan_type: plan_type.as_str().to_string(),
            status: SubscriptionStatus::Active.as_str().to_string(),
            current_period_start: provider.period_start,
            current_period_end: provider.period_end,
            provider_subscription_id: Some(provider.provider_subscription_id.clone()),
            provider_customer_id: provider.provider_customer_id.clone(),
        })
        .await?;

    info!(subscription_id = %sub.id, "Subscription recorded");
    Ok(sub)
}

/// Cancel a subscription.
///
/// With `cancel_at_period_end` the subscription stays active until its
/// period ends; without it the subscription is canceled now.
#[instrument(skip(tx))]
pub async fn cancel(
    tx: &mut dyn StoreTx,
    subscription_id: Uuid,
    cancel_at_period_end: bool,
    now: DateTime<Utc>,
) -> Result<(), FleetError> {
    if tx.find_subscription_by_id(subscription_id).await?.is_none() {
        return Err(FleetError::NotFound("subscription"));
    }

    if cancel_at_period_end {
        tx.set_cancel_at_period_end(subscription_id, true).await?;
    } else {
        tx.cancel_subscription(subscription_id, now).await?;
    }

    info!(cancel_at_period_end, "Subscription cancellation recorded");
    Ok(())
}

/// Provider-reported subscription state
#[derive(Debug, Clone)]
pub struct ProviderState {
    pub status: SubscriptionStatus,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
}

/// Mirror a provider-side update. Unknown subscriptions are skipped.
#[instrument(skip(tx, state))]
pub async fn apply_provider_state(
    tx: &mut dyn StoreTx,
    provider_subscription_id: &str,
    state: ProviderState,
    now: DateTime<Utc>,
) -> Result<Option<SubscriptionRow>, FleetError> {
    let Some(existing) = tx
        .find_subscription_by_provider_id(provider_subscription_id)
        .await?
    else {
        info!("No local subscription for provider update");
        return Ok(None);
    };

    let canceled_at = match state.status {
        SubscriptionStatus::Canceled => existing.canceled_at.or(Some(now)),
        _ => existing.canceled_at,
    };

    tx.update_subscription_state(
        existing.id,
        SubscriptionStateUpdate {
            status: state.status.as_str().to_string(),
            current_period_start: state.period_start,
            current_period_end: state.period_end,
            cancel_at_period_end: state.cancel_at_period_end,
            canceled_at,
        },
    )
    .await?;

    debug!(subscription_id = %existing.id, status = %state.status, "Provider state applied");
    Ok(tx.find_subscription_by_id(existing.id).await?)
}

/// Mark a provider subscription canceled. Unknown subscriptions are skipped.
#[instrument(skip(tx))]
pub async fn cancel_by_provider_id(
    tx: &mut dyn StoreTx,
    provider_subscription_id: &str,
    now: DateTime<Utc>,
) -> Result<bool, FleetError> {
    match tx
        .find_subscription_by_provider_id(provider_subscription_id)
        .await?
    {
        Some(existing) => {
            tx.cancel_subscription(existing.id, now).await?;
            info!(subscription_id = %existing.id, "Subscription canceled by provider");
            Ok(true)
        }
        None => {
            info!("No local subscription to cancel");
            Ok(false)
        }
    }
}

/// Extend a subscription to a newly paid period and mark it active
#[instrument(skip(tx))]
pub async fn extend_period(
    tx: &mut dyn StoreTx,
    provider_subscription_id: &str,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
) -> Result<bool, FleetError> {
    let Some(existing) = tx
        .find_subscription_by_provider_id(provider_subscription_id)
        .await?
    else {
        info!("No local subscription for paid invoice");
        return Ok(false);
    };

    tx.update_subscription_state(
        existing.id,
        SubscriptionStateUpdate {
            status: SubscriptionStatus::Active.as_str().to_string(),
            current_period_start: period_start,
            current_period_end: period_end,
            cancel_at_period_end: existing.cancel_at_period_end,
            canceled_at: existing.canceled_at,
        },
    )
    .await?;

    info!(subscription_id = %existing.id, period_end = %period_end, "Subscription period extended");
    Ok(true)
}

/// Mark a subscription inactive after a failed renewal payment
#[instrument(skip(tx))]
pub async fn suspend(
    tx: &mut dyn StoreTx,
    provider_subscription_id: &str,
) -> Result<bool, FleetError> {
    let Some(existing) = tx
        .find_subscription_by_provider_id(provider_subscription_id)
        .await?
    else {
        info!("No local subscription for failed invoice");
        return Ok(false);
    };

    tx.update_subscription_state(
        existing.id,
        SubscriptionStateUpdate {
            status: SubscriptionStatus::Inactive.as_str().to_string(),
            current_period_start: existing.current_period_start,
            current_period_end: existing.current_period_end,
            cancel_at_period_end: existing.cancel_at_period_end,
            canceled_at: existing.canceled_at,
        },
    )
    .await?;

    info!(subscription_id = %existing.id, "Subscription marked inactive");
    Ok(true)
}

/// Active subscriptions whose period ends within `within` of `now`
pub async fn find_expiring_subscriptions(
    tx: &mut dyn StoreTx,
    now: DateTime<Utc>,
    within: chrono::Duration,
) -> Result<Vec<SubscriptionRow>, FleetError> {
    Ok(tx.find_expiring_subscriptions(now, now + within).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn subscription(status: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> SubscriptionRow {
        SubscriptionRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            robot_id: Uuid::new_v4(),
            plan_type: "basic".to_string(),
            status: status.to_string(),
            current_period_start: start,
            current_period_end: end,
            provider_subscription_id: Some("sub_1".to_string()),
            provider_customer_id: None,
            cancel_at_period_end: false,
            canceled_at: None,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn test_period_boundaries() {
        let start = Utc::now();
        let end = start + Duration::days(30);
        let sub = subscription("active", start, end);

        assert!(is_subscription_active(&sub, start));
        assert!(is_subscription_active(&sub, end - Duration::seconds(1)));
        assert!(!is_subscription_active(&sub, end));
        assert!(!is_subscription_active(&sub, start - Duration::seconds(1)));
    }

    #[test]
    fn test_inactive_status_is_never_active() {
        let start = Utc::now() - Duration::days(1);
        let sub = subscription("canceled", start, start + Duration::days(30));
        assert!(!is_subscription_active(&sub, Utc::now()));
    }

    #[test]
    fn test_should_renew() {
        let now = Utc::now();
        let lead = Duration::hours(24);

        let due = subscription("active", now - Duration::days(29), now + Duration::hours(12));
        assert!(should_renew(&due, now, lead));

        let early = subscription("active", now, now + Duration::days(10));
        assert!(!should_renew(&early, now, lead));

        let mut flagged = due.clone();
        flagged.cancel_at_period_end = true;
        assert!(!should_renew(&flagged, now, lead));

        let inactive = subscription("inactive", now - Duration::days(29), now + Duration::hours(1));
        assert!(!should_renew(&inactive, now, lead));

        // Period already over: nothing left to renew ahead of
        let lapsed = subscription("active", now - Duration::days(40), now - Duration::days(10));
        assert!(!should_renew(&lapsed, now, lead));
    }

    #[test]
    fn test_entitlement_precedence() {
        let now = Utc::now();
        let future = Some(now + Duration::days(1));
        let past = Some(now - Duration::days(1));

        assert!(is_entitled(RobotStatus::Active, true, None, now));
        assert!(is_entitled(RobotStatus::Active, false, future, now));
        assert!(!is_entitled(RobotStatus::Active, false, past, now));
        assert!(!is_entitled(RobotStatus::Active, false, None, now));
        assert!(!is_entitled(RobotStatus::Suspended, true, future, now));
        assert!(!is_entitled(RobotStatus::Pending, true, future, now));
    }
}
