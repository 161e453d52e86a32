//! Conversation quota ledger
//!
//! One conversation step is a single transaction: re-check the robot's
//! entitlement, enforce the owner's message quota, generate a reply, then
//! log it and bump the counters. Any failure before commit leaves no trace.

use std::sync::Arc;

use chrono::Utc;
use robo_db::{
    ConversationLogRepository, CreateConversationLog, RobotRepository, Store, UserRepository,
};
use robo_types::{Reply, RobotId};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::{FleetPolicy, MAX_PROMPT_CHARS};
use crate::error::FleetError;
use crate::generator::ResponseGenerator;
use crate::ledger;
use crate::notify::{spawn_notification, ReplyNotifier};

/// Trim and check a prompt
pub fn validate_prompt(prompt: &str) -> Result<&str, FleetError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(FleetError::InvalidArgument(
            "text must not be empty".to_string(),
        ));
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(FleetError::InvalidArgument(format!(
            "text must be at most {MAX_PROMPT_CHARS} characters"
        )));
    }
    Ok(prompt)
}

/// Runs quota-checked conversations for authenticated robots
#[derive(Clone)]
pub struct ConversationService {
    store: Arc<dyn Store>,
    generator: Arc<dyn ResponseGenerator>,
    notifier: Arc<dyn ReplyNotifier>,
    policy: FleetPolicy,
}

impl ConversationService {
    pub fn new(
        store: Arc<dyn Store>,
        generator: Arc<dyn ResponseGenerator>,
        notifier: Arc<dyn ReplyNotifier>,
        policy: FleetPolicy,
    ) -> Self {
        Self {
            store,
            generator,
            notifier,
            policy,
        }
    }

    /// Answer `prompt` on behalf of `robot_id`
    #[instrument(skip(self, prompt), fields(robot_id = %robot_id))]
    pub async fn converse(&self, robot_id: RobotId, prompt: &str) -> Result<Reply, FleetError> {
        let prompt = validate_prompt(prompt)?;
        let now = Utc::now();

        let mut tx = self.store.begin().await?;

        let robot = tx
            .lock_robot(robot_id.0)
            .await?
            .ok_or(FleetError::Unauthorized)?;
        let owner = tx
            .lock_user(robot.user_id)
            .await?
            .ok_or(FleetError::Forbidden)?;

        ledger::check_entitlement(tx.as_mut(), &robot, now).await?;

        if owner.messages_used >= self.policy.message_quota {
            debug!(used = owner.messages_used, quota = self.policy.message_quota, "Quota reached");
            return Err(FleetError::TooManyRequests {
                used: owner.messages_used,
                quota: self.policy.message_quota,
            });
        }

        let generated = self.generator.generate(prompt).await?;
        let reply = generated.reply;
        if reply.reply.trim().is_empty() || reply.mood.trim().is_empty() {
            return Err(FleetError::Generation("incomplete reply".to_string()));
        }

        tx.append_conversation_log(CreateConversationLog {
            id: Uuid::new_v4(),
            robot_id: robot.id,
            question: prompt.to_string(),
            answer: reply.reply.clone(),
            mood: reply.mood.clone(),
            cost: generated.cost,
        })
        .await?;
        tx.touch_last_ping(robot.id, now).await?;
        let used = tx.increment_messages_used(owner.id).await?;

        tx.commit().await?;
        info!(messages_used = used, mood = %reply.mood, "Conversation recorded");

        spawn_notification(
            Arc::clone(&self.notifier),
            reply.clone(),
            self.policy.notify_timeout,
        );

        Ok(reply)
    }
}
