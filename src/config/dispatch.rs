//! Dispatch configuration.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::core::{AppResult, EligibilityPolicy, MessageKind};

/// Hard upper bound on the inter-send delay, in seconds.
pub const MAX_DELAY_SECS: u64 = 10;

/// Longest accepted invitation cooldown, in seconds (one year).
pub const MAX_COOLDOWN_SECS: u64 = 365 * 24 * 3_600;

/// Prefix of every environment variable read by [`DispatchConfig::from_env`].
pub const ENV_PREFIX: &str = "BULK_NOTIFY_";

/// Per-kind recipient ceilings for one submission. `None` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipientCaps {
    /// Cap for invitation submissions.
    pub invitation: Option<usize>,
    /// Cap for announcement submissions.
    pub announcement: Option<usize>,
    /// Cap for custom-message submissions.
    pub custom: Option<usize>,
}

impl Default for RecipientCaps {
    fn default() -> Self {
        Self {
            invitation: Some(100),
            announcement: None,
            custom: Some(100),
        }
    }
}

impl RecipientCaps {
    /// Cap applying to `kind`.
    #[must_use]
    pub const fn for_kind(&self, kind: MessageKind) -> Option<usize> {
        match kind {
            MessageKind::Invitation => self.invitation,
            MessageKind::Announcement => self.announcement,
            MessageKind::Custom => self.custom,
        }
    }
}

/// Root orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Prefix of generated operation identifiers.
    pub id_prefix: String,
    /// Largest inter-send delay a caller may request, in seconds.
    pub max_delay_secs: u64,
    /// Recipient ceilings per message kind.
    pub recipient_caps: RecipientCaps,
    /// Per-recipient errors kept per operation before only counting them.
    pub max_recorded_errors: usize,
    /// Executors allowed to run their send loops at the same time.
    pub max_concurrent_operations: usize,
    /// Invitation cooldown used by [`DispatchConfig::default_policy`], in seconds.
    pub default_cooldown_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            id_prefix: "bulk_email".into(),
            max_delay_secs: MAX_DELAY_SECS,
            recipient_caps: RecipientCaps::default(),
            max_recorded_errors: 1_000,
            max_concurrent_operations: num_cpus::get() * 4,
            default_cooldown_secs: 3_600,
        }
    }
}

impl DispatchConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the identifier prefix.
    #[must_use]
    pub fn with_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.id_prefix = prefix.into();
        self
    }

    /// Set the largest accepted delay.
    #[must_use]
    pub const fn with_max_delay_secs(mut self, secs: u64) -> Self {
        self.max_delay_secs = secs;
        self
    }

    /// Set the recipient ceilings.
    #[must_use]
    pub const fn with_recipient_caps(mut self, caps: RecipientCaps) -> Self {
        self.recipient_caps = caps;
        self
    }

    /// Set the bound on recorded per-recipient errors.
    #[must_use]
    pub const fn with_max_recorded_errors(mut self, max: usize) -> Self {
        self.max_recorded_errors = max;
        self
    }

    /// Set the number of concurrently running send loops.
    #[must_use]
    pub const fn with_max_concurrent_operations(mut self, max: usize) -> Self {
        self.max_concurrent_operations = max;
        self
    }

    /// Set the default invitation cooldown.
    #[must_use]
    pub const fn with_default_cooldown_secs(mut self, secs: u64) -> Self {
        self.default_cooldown_secs = secs;
        self
    }

    /// Largest accepted delay.
    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs)
    }

    /// Invitation policy with the configured cooldown.
    #[must_use]
    pub fn default_policy(&self) -> EligibilityPolicy {
        let cooldown = i64::try_from(self.default_cooldown_secs.min(MAX_COOLDOWN_SECS))
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or_default();
        EligibilityPolicy::default().with_cooldown(cooldown)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.id_prefix.is_empty() {
            return Err("id_prefix must not be empty".into());
        }
        if !self
            .id_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err("id_prefix may only contain ascii letters, digits, '_' and '-'".into());
        }
        if self.max_delay_secs > MAX_DELAY_SECS {
            return Err(format!("max_delay_secs must be at most {MAX_DELAY_SECS}"));
        }
        if self.default_cooldown_secs > MAX_COOLDOWN_SECS {
            return Err(format!("default_cooldown_secs must be at most {MAX_COOLDOWN_SECS}"));
        }
        if self.max_recorded_errors == 0 {
            return Err("max_recorded_errors must be greater than 0".into());
        }
        if self.max_concurrent_operations == 0 {
            return Err("max_concurrent_operations must be greater than 0".into());
        }
        if self.max_concurrent_operations > Semaphore::MAX_PERMITS {
            return Err(format!(
                "max_concurrent_operations must be at most {}",
                Semaphore::MAX_PERMITS
            ));
        }
        let caps = [
            ("invitation", self.recipient_caps.invitation),
            ("announcement", self.recipient_caps.announcement),
            ("custom", self.recipient_caps.custom),
        ];
        for (kind, cap) in caps {
            if cap == Some(0) {
                return Err(format!("{kind} recipient cap must be greater than 0"));
            }
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate. Missing fields
    /// take their defaults.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `BULK_NOTIFY_*` environment variables, after
    /// loading a `.env` file if one exists. Unset variables keep defaults.
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        let mut cfg = Self::default();

        if let Some(prefix) = env_var::<String>("ID_PREFIX")? {
            cfg.id_prefix = prefix;
        }
        if let Some(secs) = env_var("MAX_DELAY_SECS")? {
            cfg.max_delay_secs = secs;
        }
        if let Some(max) = env_var("MAX_RECORDED_ERRORS")? {
            cfg.max_recorded_errors = max;
        }
        if let Some(max) = env_var("MAX_CONCURRENT_OPERATIONS")? {
            cfg.max_concurrent_operations = max;
        }
        if let Some(secs) = env_var("DEFAULT_COOLDOWN_SECS")? {
            cfg.default_cooldown_secs = secs;
        }
        if let Some(cap) = env_var("INVITATION_CAP")? {
            cfg.recipient_caps.invitation = Some(cap);
        }
        if let Some(cap) = env_var("ANNOUNCEMENT_CAP")? {
            cfg.recipient_caps.announcement = Some(cap);
        }
        if let Some(cap) = env_var("CUSTOM_CAP")? {
            cfg.recipient_caps.custom = Some(cap);
        }

        cfg.validate().map_err(|e| anyhow!(e))?;
        Ok(cfg)
    }
}

fn env_var<T>(name: &str) -> AppResult<Option<T>>
where
    T: FromStr,
    T::Err: Display + Send + Sync + 'static,
{
    let key = format!("{ENV_PREFIX}{name}");
    match env::var(&key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("invalid value for {key}")),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("cannot read {key}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = DispatchConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.recipient_caps.for_kind(MessageKind::Custom), Some(100));
        assert_eq!(cfg.recipient_caps.for_kind(MessageKind::Announcement), None);
        assert_eq!(cfg.max_delay(), Duration::from_secs(10));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(DispatchConfig::new().with_id_prefix("").validate().is_err());
        assert!(DispatchConfig::new().with_id_prefix("bulk mail").validate().is_err());
        assert!(DispatchConfig::new().with_max_delay_secs(11).validate().is_err());
        assert!(DispatchConfig::new().with_max_recorded_errors(0).validate().is_err());
        assert!(DispatchConfig::new()
            .with_max_concurrent_operations(0)
            .validate()
            .is_err());
        assert!(DispatchConfig::new()
            .with_max_concurrent_operations(usize::MAX)
            .validate()
            .is_err());
        assert!(DispatchConfig::new()
            .with_recipient_caps(RecipientCaps {
                custom: Some(0),
                ..RecipientCaps::default()
            })
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let cfg = DispatchConfig::from_json_str(
            r#"{
                "id_prefix": "contest_mail",
                "max_delay_secs": 5,
                "recipient_caps": { "announcement": 500 }
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.id_prefix, "contest_mail");
        assert_eq!(cfg.max_delay_secs, 5);
        assert_eq!(cfg.recipient_caps.announcement, Some(500));
        assert_eq!(cfg.recipient_caps.invitation, Some(100));
        assert_eq!(cfg.max_recorded_errors, 1_000);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        assert!(DispatchConfig::from_json_str(r#"{ "max_delay_secs": 60 }"#).is_err());
        assert!(DispatchConfig::from_json_str(
            r#"{ "max_concurrent_operations": 18446744073709551615 }"#
        )
        .is_err());
        assert!(DispatchConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_default_policy_uses_configured_cooldown() {
        let policy = DispatchConfig::new()
            .with_default_cooldown_secs(120)
            .default_policy();
        assert_eq!(policy.cooldown, TimeDelta::seconds(120));
        assert!(policy.require_uninvited);
    }

    #[test]
    fn test_from_env_reports_bad_value() {
        env::set_var("BULK_NOTIFY_MAX_RECORDED_ERRORS", "lots");
        let result = DispatchConfig::from_env();
        env::remove_var("BULK_NOTIFY_MAX_RECORDED_ERRORS");

        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("BULK_NOTIFY_MAX_RECORDED_ERRORS"));
    }
}
