//! Shared deterministic types for governor core logic.
//!
//! These types define stable contracts between components. They should not
//! depend on external state or I/O and must remain deterministic across runs.

use serde::{Deserialize, Serialize};

/// Category of automated operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Friend,
    Unfollow,
    Comment,
}

impl ActionKind {
    /// Quota-table key for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Friend => "friends",
            ActionKind::Unfollow => "unfollows",
            ActionKind::Comment => "comments",
        }
    }

    /// Past-tense label recorded in the blacklist ledger.
    pub fn logged_as(self) -> &'static str {
        match self {
            ActionKind::Friend => "friended",
            ActionKind::Unfollow => "unfollowed",
            ActionKind::Comment => "commented",
        }
    }
}

/// Quota supervisor decision for one attempted action.
///
/// `Jump` means the caller must abandon the action without side effects;
/// the counter is untouched. `Proceed` means the increment has already been
/// committed (the decision and the increment are one transaction).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Proceed,
    Jump,
}

/// Terminal reason code for one action attempt.
///
/// Every governor entry point returns an [`Outcome`] carrying one of these;
/// no error escapes the public boundary. String forms are stable and surface
/// in logs and to batch callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Success,
    /// Quota for the action kind is exhausted in the current window.
    Jumped,
    /// The target already hit the per-target restriction limit.
    AlreadyFriended,
    /// Both verification passes failed; a platform-side block is assumed
    /// and the cooldown timer has been invoked.
    TemporaryBlock,
    /// Neither the acted nor the not-yet-acted UI signature was present.
    Unexpected,
    /// No comment input element on the page.
    CommentingDisabled,
    /// The input element rejected the injected text.
    InvalidElementState,
    /// The target's page could not be loaded.
    TargetUnavailable,
    /// The persistent store is unreachable; the session must abort rather
    /// than guess eligibility.
    StorageUnavailable,
    /// The UI driver reported a session-level fault.
    CollaboratorFailure,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Reason::Success => "success",
            Reason::Jumped => "jumped",
            Reason::AlreadyFriended => "already friended",
            Reason::TemporaryBlock => "temporary block",
            Reason::Unexpected => "unexpected",
            Reason::CommentingDisabled => "commenting disabled",
            Reason::InvalidElementState => "invalid element state",
            Reason::TargetUnavailable => "user unavailable",
            Reason::StorageUnavailable => "storage unavailable",
            Reason::CollaboratorFailure => "collaborator failure",
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured result of one action attempt: a success flag plus reason code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub ok: bool,
    pub reason: Reason,
}

impl Outcome {
    pub fn success() -> Self {
        Self {
            ok: true,
            reason: Reason::Success,
        }
    }

    pub fn failed(reason: Reason) -> Self {
        Self { ok: false, reason }
    }
}
