use serde::{Deserialize, Serialize};

/// A registered user. `is_admin` grants unrestricted read visibility but
/// no implicit workspace ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
}

impl User {
    /// Display name used when rendering feed entries.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.username
    }
}
