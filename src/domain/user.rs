use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{normalize_token, Entity, ParseValueError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Agronomist,
    Viewer,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Agronomist => "agronomist",
            UserRole::Viewer => "viewer",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = ParseValueError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let role = match normalize_token(value).as_str() {
            "admin" => UserRole::Admin,
            "agronomist" | "agro" => UserRole::Agronomist,
            "viewer" | "readonly" => UserRole::Viewer,
            _ => {
                return Err(ParseValueError::new(
                    "user role",
                    value,
                    "admin, agronomist, viewer",
                ));
            }
        };
        Ok(role)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub role: UserRole,
    pub password_sha256: String,
    pub active: bool,
}

impl User {
    pub fn verify_password(&self, password: &str) -> bool {
        self.active && hash_password(password) == self.password_sha256
    }
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const ID_PREFIX: &'static str = "usr";

    fn id(&self) -> &str {
        &self.id
    }
}

pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{hash_password, User, UserRole};

    fn user(active: bool) -> User {
        User {
            id: "usr-0001".to_string(),
            username: "lea".to_string(),
            display_name: "Lea".to_string(),
            role: UserRole::Agronomist,
            password_sha256: hash_password("greenfields"),
            active,
        }
    }

    #[test]
    fn verifies_matching_password() {
        assert!(user(true).verify_password("greenfields"));
        assert!(!user(true).verify_password("wrong"));
    }

    #[test]
    fn inactive_user_never_authenticates() {
        assert!(!user(false).verify_password("greenfields"));
    }

    #[test]
    fn parses_roles() {
        assert_eq!(UserRole::from_str("Admin").unwrap(), UserRole::Admin);
        assert_eq!(UserRole::from_str("readonly").unwrap(), UserRole::Viewer);
        assert!(UserRole::from_str("owner").is_err());
    }
}
