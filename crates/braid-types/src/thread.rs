use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One conversation session.
///
/// `auto_title_version` is a monotonic counter: automatic title
/// regeneration only runs when the proposed version is greater than the
/// stored one, so a manual rename is never clobbered by a stale task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub auto_title_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_title_updated_at: Option<DateTime<Utc>>,
}

impl Thread {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            created_at: now,
            updated_at: now,
            pinned: false,
            pinned_at: None,
            auto_title_version: 0,
            auto_title_updated_at: None,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn set_pinned(&mut self, pinned: bool) {
        self.pinned = pinned;
        self.pinned_at = pinned.then(Utc::now);
        self.touch();
    }

    /// Apply an automatically generated title. Returns false when the
    /// incoming version is not newer than the stored one.
    pub fn apply_auto_title(&mut self, title: impl Into<String>, version: u32) -> bool {
        if version <= self.auto_title_version {
            return false;
        }
        self.title = title.into();
        self.auto_title_version = version;
        self.auto_title_updated_at = Some(Utc::now());
        self.touch();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_title_version_is_monotonic() {
        let mut thread = Thread::new("New chat");
        assert!(thread.apply_auto_title("Rust lifetimes", 1));
        assert!(!thread.apply_auto_title("stale", 1));
        assert_eq!(thread.title, "Rust lifetimes");
        assert!(thread.apply_auto_title("Rust lifetimes, continued", 2));
    }

    #[test]
    fn unpinning_clears_pinned_at() {
        let mut thread = Thread::new("t");
        thread.set_pinned(true);
        assert!(thread.pinned_at.is_some());
        thread.set_pinned(false);
        assert!(thread.pinned_at.is_none());
    }
}
