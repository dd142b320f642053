//! Application context - dependency injection container.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use slotwise_common::RetryConfig;
use slotwise_core::{
    BookingStore, CalendarGateway, ReconciliationService, ReminderNotifier, ReminderService,
    SchedulingEngine, SlotCatalog,
};
use slotwise_domain::{Config, Result};
use slotwise_infra::calendar::{GoogleCalendarApi, HttpCalendarGateway, RefreshTokenProvider};
use slotwise_infra::database::SqliteClientRepository;
use slotwise_infra::scheduling::PassSchedulerConfig;
use slotwise_infra::{
    DbPool, InfraError, ReconcileScheduler, ReminderScheduler, SqliteBookingStore,
};

use crate::commands::notifier::{OptInReminderNotifier, TracingReminderNotifier};

/// Holds every long-lived service. Built once at startup and shared behind
/// an `Arc` for the life of the process.
pub struct AppContext {
    pub config: Config,
    pub db: DbPool,
    pub catalog: Arc<SlotCatalog>,
    pub store: Arc<dyn BookingStore>,
    pub clients: Arc<SqliteClientRepository>,
    pub engine: Arc<SchedulingEngine>,
    pub reconciliation: Arc<ReconciliationService>,
    pub reminders: Arc<ReminderService>,
}

impl AppContext {
    /// Wire the full production stack: SQLite storage and the Google
    /// Calendar gateway with OAuth credentials from the environment.
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.calendar.request_timeout_secs))
            .build()
            .map_err(InfraError::from)?;

        let tokens = Arc::new(RefreshTokenProvider::from_config(http.clone(), &config.calendar)?);
        let api = GoogleCalendarApi::new(http, &config.calendar, tokens);
        let retry = RetryConfig {
            max_attempts: config.calendar.max_retries.max(1),
            ..RetryConfig::default()
        };
        let gateway: Arc<dyn CalendarGateway> =
            Arc::new(HttpCalendarGateway::new(Arc::new(api)).with_retry(retry));

        Self::with_gateway(config, gateway, Arc::new(TracingReminderNotifier))
    }

    /// Wire the context around an externally supplied gateway and notifier.
    /// Storage still comes from `config.database`; integration tests inject
    /// fakes here.
    pub fn with_gateway(
        config: Config,
        gateway: Arc<dyn CalendarGateway>,
        notifier: Arc<dyn ReminderNotifier>,
    ) -> Result<Self> {
        let db = DbPool::open(&config.database)?;
        let store: Arc<dyn BookingStore> = Arc::new(SqliteBookingStore::new(db.clone()));
        let clients = Arc::new(SqliteClientRepository::new(db.clone()));

        let catalog = Arc::new(SlotCatalog::from_config(&config)?);
        let engine =
            Arc::new(SchedulingEngine::new(catalog.clone(), gateway.clone(), store.clone()));

        let reconciliation = Arc::new(ReconciliationService::new(
            store.clone(),
            gateway,
            ChronoDuration::minutes(config.scheduling.grace_period_minutes),
        ));
        // Every delivery path goes through the per-client opt-out.
        let notifier = Arc::new(OptInReminderNotifier::new(clients.clone(), notifier));
        let reminders = Arc::new(ReminderService::new(
            store.clone(),
            notifier,
            ChronoDuration::minutes(config.scheduling.reminder_lead_minutes),
        ));

        Ok(Self { config, db, catalog, store, clients, engine, reconciliation, reminders })
    }

    /// Build (but do not start) the background schedulers. The caller owns
    /// their lifecycle.
    pub fn build_schedulers(&self) -> (ReconcileScheduler, ReminderScheduler) {
        let reconcile = ReconcileScheduler::new(
            PassSchedulerConfig::with_cron(&self.config.scheduling.reconcile_cron),
            self.reconciliation.clone(),
        );
        let reminder = ReminderScheduler::new(
            PassSchedulerConfig::with_cron(&self.config.scheduling.reminder_cron),
            self.reminders.clone(),
        );
        (reconcile, reminder)
    }
}
