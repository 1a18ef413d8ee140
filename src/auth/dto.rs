use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo::UserRole;

/// Request body for user registration. The username is email-shaped.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub role: UserRole,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response returned after login, register or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub role: UserRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_user_serializes_role_uppercase() {
        let user = PublicUser {
            id: Uuid::new_v4(),
            username: "alice@x.com".into(),
            role: UserRole::Patient,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("alice@x.com"));
        assert!(json.contains("\"PATIENT\""));
    }

    #[test]
    fn register_request_parses_role() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"username":"bob@x.com","password":"pw2","role":"DOCTOR"}"#,
        )
        .unwrap();
        assert_eq!(req.role, UserRole::Doctor);
    }
}
