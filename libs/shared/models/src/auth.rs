use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

impl JwtClaims {
    /// Business the dashboard user belongs to, carried in `app_metadata.business_id`.
    pub fn business_id(&self) -> Option<Uuid> {
        self.app_metadata
            .as_ref()
            .and_then(|meta| meta.get("business_id"))
            .and_then(|value| value.as_str())
            .and_then(|raw| Uuid::parse_str(raw).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub business_id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }

    /// Staff may only touch the business their token was issued for.
    pub fn can_manage(&self, business_id: Uuid) -> bool {
        self.is_admin() || self.business_id == Some(business_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_business_id_read_from_app_metadata() {
        let business_id = Uuid::new_v4();
        let claims = JwtClaims {
            sub: "user-1".to_string(),
            exp: None,
            email: None,
            role: Some("authenticated".to_string()),
            app_metadata: Some(json!({ "business_id": business_id.to_string() })),
            user_metadata: None,
            aud: None,
            iat: None,
        };
        assert_eq!(claims.business_id(), Some(business_id));
    }

    #[test]
    fn test_can_manage_is_scoped_to_business() {
        let mine = Uuid::new_v4();
        let user = User {
            id: "staff".to_string(),
            email: None,
            role: Some("authenticated".to_string()),
            business_id: Some(mine),
            created_at: None,
        };
        assert!(user.can_manage(mine));
        assert!(!user.can_manage(Uuid::new_v4()));

        let admin = User { role: Some("admin".to_string()), business_id: None, ..user };
        assert!(admin.can_manage(Uuid::new_v4()));
    }
}
