// src/models/identity.rs

use uuid::Uuid;

/// Who is making a request.
///
/// Anonymous play is supported: progression writes for an anonymous caller
/// are skipped rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Identity {
    User(Uuid),
    #[default]
    Anonymous,
}

impl Identity {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Identity::User(id) => Some(*id),
            Identity::Anonymous => None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    /// Whether this caller may see a session owned by `owner`.
    pub fn can_access(&self, owner: Option<Uuid>) -> bool {
        match owner {
            None => true,
            Some(owner) => self.user_id() == Some(owner),
        }
    }
}
