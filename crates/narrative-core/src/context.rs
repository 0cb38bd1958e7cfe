//! Caller identity and per-call naming

use chrono::Utc;

/// Identity of the caller on whose behalf operations run
#[derive(Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: String,
    pub token: String,
}

impl AuthContext {
    #[must_use]
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
        }
    }

    /// Fresh workspace name `{user}:narrative_{ms}`
    #[must_use]
    pub fn narrative_workspace_name(&self, stamp: Stamp) -> String {
        format!("{}:narrative_{}", self.user_id, stamp.0)
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Millisecond epoch timestamp used to make generated names unique
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Stamp(pub i64);

impl Stamp {
    #[inline]
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    /// Object name `Narrative.{ms}`
    #[must_use]
    pub fn narrative_object_name(self) -> String {
        format!("Narrative.{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_names() {
        let auth = AuthContext::new("alice", "secret");
        let stamp = Stamp(1_700_000_000_123);
        assert_eq!(auth.narrative_workspace_name(stamp), "alice:narrative_1700000000123");
        assert_eq!(stamp.narrative_object_name(), "Narrative.1700000000123");
    }

    #[test]
    fn debug_hides_token() {
        let auth = AuthContext::new("alice", "secret");
        assert!(!format!("{auth:?}").contains("secret"));
    }
}
