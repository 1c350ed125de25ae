use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Member,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Claims {
    pub id: Uuid, // user ID
    pub team_id: Uuid,
    pub email: String,
    pub exp: usize, // expiration (as UNIX timestamp)
    pub role: Option<UserRole>,
    pub iss: String,
    pub aud: String,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == Some(UserRole::Admin)
    }
}
