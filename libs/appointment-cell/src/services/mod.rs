pub mod availability;
pub mod booking;
pub mod cache;
pub mod calendar;
pub mod conflict;
pub mod notifications;
pub mod resolver;
pub mod slots;
pub mod validation;

pub use availability::AvailabilityService;
pub use booking::BookingService;
pub use cache::{CacheInvalidator, LogCacheInvalidator, RedisCacheInvalidator};
pub use calendar::{BusinessCalendar, BusinessClock, DefaultBusinessHours};
pub use notifications::{LogNotifier, Notifier, WebhookNotifier};
pub use resolver::EntityResolver;
pub use slots::SlotGenerator;
pub use validation::BookingValidator;
