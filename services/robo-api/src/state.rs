//! Application state for the API service.

use std::sync::Arc;
use std::time::Duration;

use robo_auth_core::{AccessGate, AuthConfig, AuthService, CredentialHasher, TokenIssuer};
use robo_billing_core::{BillingConfig, PaymentEngine, PaymentProvider, WebhookVerifier};
use robo_db::Store;
use robo_fleet_core::{
    ConversationService, FleetPolicy, RegistryService, ReplyNotifier, ResponseGenerator,
};

/// External collaborators the services are wired with
pub struct Collaborators {
    pub hasher: Arc<dyn CredentialHasher>,
    pub provider: Arc<dyn PaymentProvider>,
    pub generator: Arc<dyn ResponseGenerator>,
    pub notifier: Arc<dyn ReplyNotifier>,
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Store, for readiness checks
    pub store: Arc<dyn Store>,
    /// Registration, login and robot token issuance
    pub auth: Arc<AuthService>,
    /// Robot token and entitlement checks
    pub gate: Arc<AccessGate>,
    /// Owner-facing robot lookups
    pub registry: Arc<RegistryService>,
    /// Checkout and webhook reconciliation
    pub payments: Arc<PaymentEngine>,
    /// Quota-checked conversations
    pub conversations: Arc<ConversationService>,
    /// Webhook signature verification
    pub webhooks: WebhookVerifier,
    request_timeout: Duration,
}

impl AppState {
    /// Wire every service over one store
    pub fn new(
        store: Arc<dyn Store>,
        auth: AuthConfig,
        billing: BillingConfig,
        policy: FleetPolicy,
        collaborators: Collaborators,
        request_timeout: Duration,
    ) -> Self {
        let tokens = TokenIssuer::new(auth);
        let webhooks = WebhookVerifier::new(billing.stripe_webhook_secret.clone());

        Self {
            auth: Arc::new(AuthService::new(
                Arc::clone(&store),
                tokens.clone(),
                collaborators.hasher,
            )),
            gate: Arc::new(AccessGate::new(Arc::clone(&store), tokens)),
            registry: Arc::new(RegistryService::new(Arc::clone(&store))),
            payments: Arc::new(PaymentEngine::new(
                Arc::clone(&store),
                collaborators.provider,
                billing,
                policy.clone(),
            )),
            conversations: Arc::new(ConversationService::new(
                Arc::clone(&store),
                collaborators.generator,
                collaborators.notifier,
                policy,
            )),
            webhooks,
            store,
            request_timeout,
        }
    }

    /// Get request timeout
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}
