use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    /// IANA zone the business operates in. One business, one timezone.
    pub business_timezone: String,
    pub default_open_time: String,
    pub default_close_time: String,
    pub booking_slot_interval_minutes: u32,
    pub calendar_slot_interval_minutes: u32,
    pub default_phone_country_code: String,
    pub notification_webhook_url: Option<String>,
    pub notification_timeout_secs: u64,
    pub redis_url: Option<String>,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub agent_history_window: usize,
    pub agent_max_tool_rounds: usize,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            business_timezone: env_or("BUSINESS_TIMEZONE", "America/Sao_Paulo"),
            default_open_time: env_or("DEFAULT_OPEN_TIME", "09:00"),
            default_close_time: env_or("DEFAULT_CLOSE_TIME", "19:00"),
            booking_slot_interval_minutes: env_parse("BOOKING_SLOT_INTERVAL_MINUTES", 30),
            calendar_slot_interval_minutes: env_parse("CALENDAR_SLOT_INTERVAL_MINUTES", 15),
            default_phone_country_code: env_or("DEFAULT_PHONE_COUNTRY_CODE", "55"),
            notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.is_empty()),
            notification_timeout_secs: env_parse("NOTIFICATION_TIMEOUT_SECS", 5),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            openai_api_key: env::var("OPENAI_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("OPENAI_API_KEY not set, agent chat will be unavailable");
                    String::new()
                }),
            openai_model: env_or("OPENAI_MODEL", "gpt-4o-mini"),
            openai_base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            agent_history_window: env_parse("AGENT_HISTORY_WINDOW", 20),
            agent_max_tool_rounds: env_parse("AGENT_MAX_TOOL_ROUNDS", 5),
            port: env_parse("PORT", 3000),
        };

        if !config.is_configured() {
            warn!("Supabase not configured - falling back to in-memory booking store");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_agent_configured(&self) -> bool {
        !self.openai_api_key.is_empty() && !self.openai_base_url.is_empty()
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parse_falls_back_on_garbage() {
        env::set_var("SHARED_CONFIG_TEST_INTERVAL", "not-a-number");
        let value: u32 = env_parse("SHARED_CONFIG_TEST_INTERVAL", 30);
        assert_eq!(value, 30);

        env::set_var("SHARED_CONFIG_TEST_INTERVAL", " 45 ");
        let value: u32 = env_parse("SHARED_CONFIG_TEST_INTERVAL", 30);
        assert_eq!(value, 45);
        env::remove_var("SHARED_CONFIG_TEST_INTERVAL");
    }

    #[test]
    fn test_env_or_ignores_empty_values() {
        env::set_var("SHARED_CONFIG_TEST_ZONE", "");
        assert_eq!(env_or("SHARED_CONFIG_TEST_ZONE", "UTC"), "UTC");
        env::remove_var("SHARED_CONFIG_TEST_ZONE");
    }
}
