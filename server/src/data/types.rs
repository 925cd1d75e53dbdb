//! Row types shared by the repositories and the auth layer

use std::fmt;

use serde::Serialize;

/// User account row
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct UserRow {
    pub id: String,
    pub login: String,
    pub email: Option<String>,
    pub realname: Option<String>,
    /// Argon2 PHC string; absent for accounts provisioned from a proxy or directory
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub is_admin: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl fmt::Debug for UserRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRow")
            .field("id", &self.id)
            .field("login", &self.login)
            .field("email", &self.email)
            .field("realname", &self.realname)
            .field(
                "password_hash",
                &self.password_hash.as_ref().map(|_| "<redacted>"),
            )
            .field("is_admin", &self.is_admin)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Fields for inserting a new user
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub login: String,
    pub email: Option<String>,
    pub realname: Option<String>,
    pub password_hash: Option<String>,
    pub is_admin: bool,
}

/// Project row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRow {
    pub id: String,
    pub name: String,
    pub owner_user_id: Option<String>,
    pub created_at: i64,
}

/// Server-side session record; the id doubles as the token's `jti`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRow {
    pub id: String,
    pub user_id: String,
    pub auth_method: String,
    pub created_at: i64,
    pub expires_at: i64,
}

impl SessionRow {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_row_hides_password_hash() {
        let user = UserRow {
            id: "u1".to_string(),
            login: "tom".to_string(),
            email: None,
            realname: None,
            password_hash: Some("$argon2id$v=19$secret".to_string()),
            is_admin: false,
            created_at: 0,
            updated_at: 0,
        };
        assert!(!format!("{:?}", user).contains("argon2id"));
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["login"], "tom");
    }

    #[test]
    fn test_session_expiry_boundary() {
        let session = SessionRow {
            id: "s".to_string(),
            user_id: "u".to_string(),
            auth_method: "password".to_string(),
            created_at: 0,
            expires_at: 100,
        };
        assert!(!session.is_expired(99));
        assert!(session.is_expired(100));
    }
}
