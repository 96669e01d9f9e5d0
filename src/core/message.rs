//! Outbound message content.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What kind of notification an operation dispatches. Drives recipient caps
/// and whether invitation bookkeeping runs after each successful send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Invitation to join; gated by the invitation eligibility rule.
    Invitation,
    /// Announcement to known recipients (e.g. a new contest).
    Announcement,
    /// Operator-authored message.
    Custom,
}

impl MessageKind {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invitation => "invitation",
            Self::Announcement => "announcement",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rendered message, sent unchanged to every recipient of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message kind.
    pub kind: MessageKind,
    /// Subject line.
    pub subject: String,
    /// Rendered body.
    pub body: String,
}

impl Message {
    /// Build a message of the given kind.
    pub fn new(kind: MessageKind, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Invitation message.
    pub fn invitation(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(MessageKind::Invitation, subject, body)
    }

    /// Announcement message.
    pub fn announcement(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(MessageKind::Announcement, subject, body)
    }

    /// Custom operator message.
    pub fn custom(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(MessageKind::Custom, subject, body)
    }
}
