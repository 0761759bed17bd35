use serde::{Deserialize, Serialize};

use crate::ids::Id;

/// Identity snapshot used for team membership, followers and history text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub display_name: String,
    pub email_address: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl User {
    pub fn new(id: Id, display_name: impl Into<String>, email_address: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            email_address: email_address.into(),
            is_admin: false,
        }
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    /// Case-insensitive address match, as invites are keyed by typed email.
    pub fn has_email(&self, address: &str) -> bool {
        self.email_address.eq_ignore_ascii_case(address)
    }
}
