use serde::{Deserialize, Serialize};

/// A workspace: the unit of visibility scoping.
///
/// `members` always contains the owner. Membership and the
/// `public`/`archived` flags are mutated only through the access layer
/// entry points, in single transactions, so permission predicates never
/// observe a half-applied change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub public: bool,
    pub archived: bool,
    pub members: Vec<i64>,
}

impl Workspace {
    /// Whether `user_id` is a member (the owner always is).
    #[must_use]
    pub fn has_member(&self, user_id: i64) -> bool {
        self.members.contains(&user_id)
    }
}
