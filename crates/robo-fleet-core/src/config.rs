//! Fleet policy constants

use std::time::Duration;

/// Default number of messages a user may send across all their robots
pub const DEFAULT_MESSAGE_QUOTA: i64 = 200;

/// Default length of a plan purchased through checkout
pub const DEFAULT_PLAN_DURATION_DAYS: i64 = 30;

/// Maximum prompt length in characters
pub const MAX_PROMPT_CHARS: usize = 4000;

/// Maximum robot name length in characters
pub const MAX_ROBOT_NAME_CHARS: usize = 255;

/// Policy values shared by the fleet components
#[derive(Debug, Clone)]
pub struct FleetPolicy {
    /// Messages allowed per user before conversations are refused
    pub message_quota: i64,
    /// Validity of a newly created plan
    pub plan_duration: chrono::Duration,
    /// How long before period end a subscription becomes due for renewal
    pub renewal_lead: chrono::Duration,
    /// Upper bound on a single downstream reply notification
    pub notify_timeout: Duration,
}

impl Default for FleetPolicy {
    fn default() -> Self {
        Self {
            message_quota: DEFAULT_MESSAGE_QUOTA,
            plan_duration: chrono::Duration::days(DEFAULT_PLAN_DURATION_DAYS),
            renewal_lead: chrono::Duration::hours(24),
            notify_timeout: Duration::from_secs(5),
        }
    }
}

impl FleetPolicy {
    /// Set the message quota
    pub fn with_message_quota(mut self, quota: i64) -> Self {
        self.message_quota = quota;
        self
    }

    /// Set the plan duration in days
    pub fn with_plan_duration_days(mut self, days: i64) -> Self {
        self.plan_duration = chrono::Duration::days(days);
        self
    }

    /// Set the notification timeout
    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }
}
