//! Recipient eligibility.
//!
//! A pure decision made once per recipient at submission time. Excluded
//! recipients never enter an operation: they are not counted in its total
//! and never appear in its error log.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Directory-sourced attributes that drive eligibility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientAttributes {
    /// The address has been verified by its owner.
    pub email_verified: bool,
    /// The recipient finished onboarding.
    pub profile_completed: bool,
    /// Last time an invitation was sent, if ever.
    pub last_invitation_at: Option<DateTime<Utc>>,
}

/// A single addressee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Email address or directory key.
    pub key: String,
    /// Display name, if known.
    pub name: Option<String>,
    /// Eligibility attributes.
    pub attributes: RecipientAttributes,
}

impl Recipient {
    /// Recipient with default (never invited) attributes.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: None,
            attributes: RecipientAttributes::default(),
        }
    }

    /// Attach a display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replace the eligibility attributes.
    #[must_use]
    pub fn with_attributes(mut self, attributes: RecipientAttributes) -> Self {
        self.attributes = attributes;
        self
    }
}

/// What to do when no recipient survives filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyBatch {
    /// Create an operation that is immediately `Completed` with zero total.
    #[default]
    Complete,
    /// Create an operation that is immediately `Failed`.
    Fail,
}

/// Eligibility configuration for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityPolicy {
    /// Minimum time between two invitations to the same recipient.
    pub cooldown: TimeDelta,
    /// Apply the invitation gate (unverified, incomplete profile, cooled down).
    /// Announcements switch this off.
    pub require_uninvited: bool,
    /// Outcome for an empty batch.
    pub empty_batch: EmptyBatch,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            cooldown: TimeDelta::hours(1),
            require_uninvited: true,
            empty_batch: EmptyBatch::Complete,
        }
    }
}

impl EligibilityPolicy {
    /// Policy for announcements: every distinct recipient is eligible.
    #[must_use]
    pub fn announcement() -> Self {
        Self {
            require_uninvited: false,
            ..Self::default()
        }
    }

    /// Override the cooldown.
    #[must_use]
    pub const fn with_cooldown(mut self, cooldown: TimeDelta) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Override the empty-batch outcome.
    #[must_use]
    pub const fn with_empty_batch(mut self, empty_batch: EmptyBatch) -> Self {
        self.empty_batch = empty_batch;
        self
    }
}

/// Why a recipient was left out of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Ineligibility {
    /// Address already verified.
    EmailVerified,
    /// Onboarding already finished.
    ProfileCompleted,
    /// Invited within the cooldown window.
    CoolingDown {
        /// Seconds until the recipient becomes eligible again.
        remaining_secs: i64,
    },
    /// Same key appeared earlier in the submission.
    Duplicate,
    /// The directory could not be queried for this key.
    LookupFailed {
        /// Lookup error text.
        error: String,
    },
}

impl fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmailVerified => f.write_str("email already verified"),
            Self::ProfileCompleted => f.write_str("profile already completed"),
            Self::CoolingDown { remaining_secs } => {
                write!(f, "invited recently; eligible again in {remaining_secs}s")
            }
            Self::Duplicate => f.write_str("duplicate recipient"),
            Self::LookupFailed { error } => write!(f, "directory lookup failed: {error}"),
        }
    }
}

/// Outcome of [`evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    /// Recipient should receive the message.
    Eligible,
    /// Recipient is excluded.
    Excluded(Ineligibility),
}

impl Eligibility {
    /// Whether the recipient is eligible.
    #[must_use]
    pub const fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }

    /// Exclusion reason, if any.
    #[must_use]
    pub const fn reason(&self) -> Option<&Ineligibility> {
        match self {
            Self::Eligible => None,
            Self::Excluded(reason) => Some(reason),
        }
    }
}

/// A recipient filtered out at submission, reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    /// Recipient key.
    pub recipient: String,
    /// Why it was excluded.
    pub reason: Ineligibility,
}

/// Decide whether `recipient` should receive a message under `policy` at `now`.
#[must_use]
pub fn evaluate(
    recipient: &Recipient,
    policy: &EligibilityPolicy,
    now: DateTime<Utc>,
) -> Eligibility {
    if !policy.require_uninvited {
        return Eligibility::Eligible;
    }
    let attributes = &recipient.attributes;
    if attributes.email_verified {
        return Eligibility::Excluded(Ineligibility::EmailVerified);
    }
    if attributes.profile_completed {
        return Eligibility::Excluded(Ineligibility::ProfileCompleted);
    }
    if let Some(last) = attributes.last_invitation_at {
        let elapsed = now - last;
        if elapsed <= policy.cooldown {
            return Eligibility::Excluded(Ineligibility::CoolingDown {
                remaining_secs: (policy.cooldown - elapsed).num_seconds(),
            });
        }
    }
    Eligibility::Eligible
}

/// Split a submission into accepted recipients (submission order kept) and
/// exclusions. Repeated keys, compared case-insensitively, are excluded as
/// duplicates after their first occurrence.
#[must_use]
pub fn partition(
    recipients: Vec<Recipient>,
    policy: &EligibilityPolicy,
    now: DateTime<Utc>,
) -> (Vec<Recipient>, Vec<Exclusion>) {
    let mut seen = HashSet::with_capacity(recipients.len());
    let mut accepted = Vec::with_capacity(recipients.len());
    let mut excluded = Vec::new();

    for recipient in recipients {
        if !seen.insert(recipient.key.trim().to_lowercase()) {
            excluded.push(Exclusion {
                recipient: recipient.key,
                reason: Ineligibility::Duplicate,
            });
            continue;
        }
        match evaluate(&recipient, policy, now) {
            Eligibility::Eligible => accepted.push(recipient),
            Eligibility::Excluded(reason) => excluded.push(Exclusion {
                recipient: recipient.key,
                reason,
            }),
        }
    }
    (accepted, excluded)
}
