use std::sync::Arc;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub business_timezone: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            business_timezone: "UTC".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            business_timezone: self.business_timezone.clone(),
            default_open_time: "09:00".to_string(),
            default_close_time: "19:00".to_string(),
            booking_slot_interval_minutes: 30,
            calendar_slot_interval_minutes: 15,
            default_phone_country_code: "55".to_string(),
            notification_webhook_url: None,
            notification_timeout_secs: 1,
            redis_url: None,
            openai_api_key: "test-openai-key".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: "http://localhost:54322/v1".to_string(),
            agent_history_window: 20,
            agent_max_tool_rounds: 5,
            port: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
    pub business_id: Option<Uuid>,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "authenticated".to_string(),
            business_id: None,
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str, business_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
            business_id,
        }
    }

    pub fn staff(email: &str, business_id: Uuid) -> Self {
        Self::new(email, "authenticated", Some(business_id))
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin", None)
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            business_id: self.business_id,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let mut payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });
        if let Some(business_id) = user.business_id {
            payload["app_metadata"] = json!({ "business_id": business_id.to_string() });
        }

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }
}

/// PostgREST-shaped rows for the booking tables.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn service_row(id: Uuid, business_id: Uuid, name: &str, duration_minutes: i32) -> Value {
        json!({
            "id": id,
            "business_id": business_id,
            "name": name,
            "duration_minutes": duration_minutes,
            "price": 50.0
        })
    }

    pub fn professional_row(id: Uuid, business_id: Uuid, name: &str) -> Value {
        json!({
            "id": id,
            "business_id": business_id,
            "name": name
        })
    }

    pub fn client_row(id: Uuid, business_id: Uuid, name: &str, phone: &str) -> Value {
        json!({
            "id": id,
            "business_id": business_id,
            "name": name,
            "phone": phone
        })
    }

    pub fn business_hours_row(business_id: Uuid, day_of_week: u8, open: &str, close: &str, is_open: bool) -> Value {
        json!({
            "business_id": business_id,
            "day_of_week": day_of_week,
            "is_open": is_open,
            "open_time": open,
            "close_time": close
        })
    }

    pub fn appointment_row(
        id: Uuid,
        business_id: Uuid,
        professional_id: Uuid,
        service_id: Uuid,
        client_id: Uuid,
        start_time: DateTime<Utc>,
        duration_minutes: i64,
    ) -> Value {
        json!({
            "id": id,
            "business_id": business_id,
            "professional_id": professional_id,
            "service_id": service_id,
            "client_id": client_id,
            "start_time": start_time.to_rfc3339(),
            "end_time": (start_time + Duration::minutes(duration_minutes)).to_rfc3339(),
            "status": "scheduled",
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(app_config.is_configured());
        assert_eq!(app_config.booking_slot_interval_minutes, 30);
        assert_eq!(app_config.calendar_slot_interval_minutes, 15);
    }

    #[test]
    fn test_user_creation() {
        let business_id = Uuid::new_v4();
        let user = TestUser::staff("owner@salon.test", business_id);

        let user_model = user.to_user();
        assert_eq!(user_model.email, Some(user.email.clone()));
        assert_eq!(user_model.business_id, Some(business_id));
        assert!(user_model.can_manage(business_id));
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let token = JwtTestUtils::create_test_token(&user, "test-secret", Some(1));

        assert_eq!(token.split('.').count(), 3);
    }
}
