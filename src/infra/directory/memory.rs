//! In-memory recipient directory for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::core::{Directory, DirectoryError, RecipientAttributes};

/// Directory keyed by lowercased email address.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    entries: RwLock<HashMap<String, RecipientAttributes>>,
}

impl InMemoryDirectory {
    /// Empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a recipient.
    pub fn insert(&self, key: &str, attributes: RecipientAttributes) {
        self.entries.write().insert(normalize(key), attributes);
    }

    /// Current attributes of a recipient.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<RecipientAttributes> {
        self.entries.read().get(&normalize(key)).cloned()
    }
}

fn normalize(key: &str) -> String {
    key.trim().to_lowercase()
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn eligible_attributes(
        &self,
        key: &str,
    ) -> Result<Option<RecipientAttributes>, DirectoryError> {
        Ok(self.get(key))
    }

    async fn record_invitation(&self, key: &str, at: DateTime<Utc>) -> Result<(), DirectoryError> {
        self.entries
            .write()
            .entry(normalize(key))
            .or_default()
            .last_invitation_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let directory = InMemoryDirectory::new();
        directory.insert(
            "Student@Example.com",
            RecipientAttributes {
                email_verified: true,
                ..RecipientAttributes::default()
            },
        );

        let found = directory
            .eligible_attributes("student@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(found.email_verified);
        assert!(directory
            .eligible_attributes("other@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_record_invitation_creates_entry() {
        let directory = InMemoryDirectory::new();
        let at = Utc::now();
        directory.record_invitation("new@example.com", at).await.unwrap();
        assert_eq!(
            directory.get("new@example.com").unwrap().last_invitation_at,
            Some(at)
        );
    }
}
