//! Governor configuration stored under `.governor/config.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::types::ActionKind;
use crate::verify::VerifyTimeouts;

/// Governor configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values. There is no shared
/// settings object at runtime: each component is constructed from the slice
/// of this struct it needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GovernorConfig {
    /// Identity the persisted counters are keyed by.
    pub profile_id: String,

    /// Per-kind quota limits. An absent table means the kind is unlimited.
    pub quota: QuotaConfig,

    /// Maximum verified friend actions against one target.
    pub friend_times: u32,

    /// Bounded-wait timeouts for the verification state machine.
    pub verify: VerifyConfig,

    /// Base of the humanized post-action delay, in seconds.
    pub action_delay_secs: u64,

    /// Cooldown after a suspected temporary block, in seconds.
    pub cooldown_secs: u64,

    /// Blacklist ledger settings.
    pub blacklist: BlacklistConfig,

    /// Comment templates; `{{ name }}` is the target's display name.
    pub comments: Vec<String>,
}

/// Absolute count allowed within a fixed window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuotaLimit {
    pub limit: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QuotaConfig {
    pub friends: Option<QuotaLimit>,
    pub unfollows: Option<QuotaLimit>,
    pub comments: Option<QuotaLimit>,
}

impl QuotaConfig {
    pub fn for_kind(&self, kind: ActionKind) -> Option<&QuotaLimit> {
        match kind {
            ActionKind::Friend => self.friends.as_ref(),
            ActionKind::Unfollow => self.unfollows.as_ref(),
            ActionKind::Comment => self.comments.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VerifyConfig {
    /// First wait for the post-action signature.
    pub first_wait_secs: u64,
    /// Status re-read wait after an explicit reload.
    pub reload_wait_secs: u64,
    /// Second, longer verification wait after re-invoking the action.
    pub retry_wait_secs: u64,
    /// Wait for an optional confirmation dialog to appear.
    pub dialog_wait_secs: u64,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            first_wait_secs: 7,
            reload_wait_secs: 14,
            retry_wait_secs: 9,
            dialog_wait_secs: 4,
        }
    }
}

impl VerifyConfig {
    pub fn timeouts(&self) -> VerifyTimeouts {
        VerifyTimeouts {
            first: Duration::from_secs(self.first_wait_secs),
            reload: Duration::from_secs(self.reload_wait_secs),
            retry: Duration::from_secs(self.retry_wait_secs),
            dialog: Duration::from_secs(self.dialog_wait_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BlacklistConfig {
    pub enabled: bool,
    pub campaign: String,
}

impl Default for BlacklistConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            campaign: "default".to_string(),
        }
    }
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            profile_id: "default".to_string(),
            quota: QuotaConfig {
                friends: Some(QuotaLimit {
                    limit: 40,
                    window_secs: 24 * 3600,
                }),
                unfollows: Some(QuotaLimit {
                    limit: 60,
                    window_secs: 24 * 3600,
                }),
                comments: Some(QuotaLimit {
                    limit: 25,
                    window_secs: 24 * 3600,
                }),
            },
            friend_times: 1,
            verify: VerifyConfig::default(),
            action_delay_secs: 10,
            cooldown_secs: 210,
            blacklist: BlacklistConfig::default(),
            comments: vec![
                "Nice one, {{ name }}!".to_string(),
                "Great post {{ name }} :grinning:".to_string(),
            ],
        }
    }
}

impl GovernorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.profile_id.trim().is_empty() {
            return Err(anyhow!("profile_id must be non-empty"));
        }
        if self.friend_times == 0 {
            return Err(anyhow!("friend_times must be > 0"));
        }
        for (name, limit) in [
            ("friends", &self.quota.friends),
            ("unfollows", &self.quota.unfollows),
            ("comments", &self.quota.comments),
        ] {
            if let Some(limit) = limit
                && limit.window_secs == 0
            {
                return Err(anyhow!("quota.{name}.window_secs must be > 0"));
            }
        }
        for (name, secs) in [
            ("first_wait_secs", self.verify.first_wait_secs),
            ("reload_wait_secs", self.verify.reload_wait_secs),
            ("retry_wait_secs", self.verify.retry_wait_secs),
        ] {
            if secs == 0 {
                return Err(anyhow!("verify.{name} must be > 0"));
            }
        }
        if self.comments.is_empty() {
            return Err(anyhow!("comments must list at least one template"));
        }
        if self.blacklist.enabled && self.blacklist.campaign.trim().is_empty() {
            return Err(anyhow!("blacklist.campaign must be non-empty when enabled"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `GovernorConfig::default()`.
pub fn load_config(path: &Path) -> Result<GovernorConfig> {
    if !path.exists() {
        let cfg = GovernorConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: GovernorConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &GovernorConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
