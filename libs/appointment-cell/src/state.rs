// libs/appointment-cell/src/state.rs
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::services::{
    AvailabilityService, BookingService, BookingValidator, BusinessClock, CacheInvalidator, DefaultBusinessHours,
    LogCacheInvalidator, LogNotifier, Notifier, RedisCacheInvalidator, WebhookNotifier,
};
use crate::store::{BookingStore, MemoryBookingStore, SupabaseBookingStore};

/// Business id of the demo catalog served when no database is configured.
pub const DEMO_BUSINESS_ID: Uuid = Uuid::nil();

/// Shared handler state for the booking engine.
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub availability: AvailabilityService,
    pub validator: BookingValidator,
    pub booking: BookingService,
}

impl AppointmentState {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn BookingStore>,
        notifier: Arc<dyn Notifier>,
        cache: Arc<dyn CacheInvalidator>,
    ) -> Self {
        let availability = AvailabilityService::new(
            Arc::clone(&store),
            BusinessClock::from_config(&config),
            DefaultBusinessHours::from_config(&config),
            config.booking_slot_interval_minutes,
            config.calendar_slot_interval_minutes,
        );
        let validator = BookingValidator::new(availability.clone());
        let booking = BookingService::new(
            availability.clone(),
            store,
            notifier,
            cache,
            config.default_phone_country_code.clone(),
            Duration::from_secs(config.notification_timeout_secs),
        );

        Self {
            config,
            availability,
            validator,
            booking,
        }
    }

    /// Picks the store and side-effect collaborators from configuration.
    /// Optional backends that fail to connect degrade to log-only versions.
    pub async fn from_config(config: Arc<AppConfig>) -> Self {
        let store: Arc<dyn BookingStore> = if config.is_configured() {
            info!("Using Supabase booking store at {}", config.supabase_url);
            Arc::new(SupabaseBookingStore::new(Arc::new(SupabaseClient::new(&config))))
        } else {
            warn!(
                "Supabase is not configured; serving an in-memory demo catalog for business {}",
                DEMO_BUSINESS_ID
            );
            Arc::new(MemoryBookingStore::with_demo_catalog(DEMO_BUSINESS_ID).await)
        };

        let notifier: Arc<dyn Notifier> = match &config.notification_webhook_url {
            Some(url) => {
                info!("Appointment notifications go to {}", url);
                Arc::new(WebhookNotifier::new(url.clone()))
            }
            None => Arc::new(LogNotifier),
        };

        let cache: Arc<dyn CacheInvalidator> = match &config.redis_url {
            Some(url) => match RedisCacheInvalidator::new(url).await {
                Ok(redis) => Arc::new(redis),
                Err(e) => {
                    warn!("Redis unavailable ({}), cache invalidation will only be logged", e);
                    Arc::new(LogCacheInvalidator)
                }
            },
            None => Arc::new(LogCacheInvalidator),
        };

        Self::new(config, store, notifier, cache)
    }
}
