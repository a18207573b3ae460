//! Shared server state
//!
//! Everything a request handler needs, behind `Arc`s so the state
//! clones cheaply into each request. Collaborator seams (store,
//! processor, notifier) are trait objects; `initialize` wires the
//! bundled single-instance implementations.

use std::sync::Arc;

use crate::audit::AuditTrail;
use crate::core::Config;
use crate::db::{MemoryStore, Store};
use crate::notify::{LogNotifier, NotificationService, Notifier};
use crate::orders::OrderLifecycle;
use crate::payments::{PaymentProcessor, SandboxProcessor};
use crate::ratelimit::{RateLimiter, SlidingWindowLimiter};

#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub lifecycle: Arc<OrderLifecycle>,
    pub notifications: Arc<NotificationService>,
    pub limiter: Arc<dyn RateLimiter>,
}

impl ServerState {
    /// Wire the default single-instance stack: in-memory store with
    /// the standard pickup windows, sandbox processor, log-only
    /// notifier.
    pub fn initialize(config: &Config) -> Self {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::with_default_windows());
        let processor: Arc<dyn PaymentProcessor> = Arc::new(SandboxProcessor::new());
        let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);
        Self::with_collaborators(config, store, processor, notifier)
    }

    /// Wire explicit collaborators (tests, alternative backends)
    pub fn with_collaborators(
        config: &Config,
        store: Arc<dyn Store>,
        processor: Arc<dyn PaymentProcessor>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let notifications = Arc::new(NotificationService::new(notifier, store.clone()));
        let audit = Arc::new(AuditTrail::new(store.clone()));
        let lifecycle = Arc::new(OrderLifecycle::new(
            store.clone(),
            processor,
            notifications.clone(),
            audit,
            config.ops_email.clone(),
        ));
        let limiter = Arc::new(SlidingWindowLimiter::new(
            config.rate_limit_max,
            (config.rate_limit_window_secs * 1000) as i64,
        ));

        Self {
            config: Arc::new(config.clone()),
            store,
            lifecycle,
            notifications,
            limiter,
        }
    }
}
