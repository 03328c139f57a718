use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Trainer,
    Student,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Trainer => "trainer",
            UserRole::Student => "student",
        }
    }
}

/// One of the fixed tutor accounts.
#[derive(Debug, Clone)]
pub struct Account {
    pub username: String,
    pub role: UserRole,
    pub password_hash: String,
    /// Numeric suffix of a student account (`student03` -> 3); stands in for `x` in lab addressing.
    pub lab_id: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub role: UserRole,
}

impl From<&Account> for UserProfile {
    fn from(account: &Account) -> Self {
        Self {
            username: account.username.clone(),
            role: account.role,
        }
    }
}

/// Form body of `POST /token` (OAuth2 password flow).
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}
