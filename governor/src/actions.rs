//! Orchestration for single governed actions.
//!
//! Every entry point walks the same gauntlet: quota gate, eligibility check,
//! UI attempt through the driver, verification with bounded retry, and ledger
//! plus restriction updates only after verified success. Every terminal path
//! returns an [`Outcome`]; driver and storage faults are mapped to reason
//! codes, never propagated.
//!
//! Ordering is deliberate and preserved from the system this replaces: quota
//! is consumed before the attempt is known to succeed (a UI-level failure
//! still burns budget), while restriction and blacklist rows mutate only
//! after the action is verified.

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use crate::config::{BlacklistConfig, GovernorConfig, QuotaConfig};
use crate::core::compose::CommentComposer;
use crate::core::types::{ActionKind, Outcome, QuotaDecision, Reason};
use crate::io::driver::{DriverError, Selector, UiDriver};
use crate::io::pacing::Pacer;
use crate::io::store::{Store, StoreError};
use crate::verify::{
    ActionProbes, Observation, VerifyOutcome, VerifyTimeouts, dismiss_confirm_dialog, read_status,
    verify_action,
};

/// Page-glue input for one friend/unfollow action: where the target lives and
/// which signatures identify the control's states.
#[derive(Debug, Clone)]
pub struct ActionSurface {
    /// Target's profile (or post) URL.
    pub page_url: String,
    /// Control in its not-yet-acted state (e.g. "Add Friend" / "Follow").
    pub actionable: Vec<Selector>,
    /// Post-action signatures (e.g. "Following" / "Requested").
    pub confirm: Vec<Selector>,
    /// Confirmation-dialog button the click may pop up (unfollow).
    pub confirm_dialog: Option<Selector>,
}

/// Page-glue input for one comment action.
#[derive(Debug, Clone)]
pub struct CommentSurface {
    pub page_url: String,
    /// Button that expands the comment section, when the page has one.
    pub open_section: Option<Selector>,
    /// Input element candidates, tried in order.
    pub inputs: Vec<Selector>,
}

/// Terminal result of the UI-level portion of an attempt.
enum Verdict {
    Success,
    Failed(Reason),
}

/// The action-execution governor. Owns the persistent store; holds only the
/// config slices it needs. The UI driver and pacer are passed per call since
/// they belong to the session, not the governor.
pub struct Governor {
    store: Store,
    profile_id: String,
    quotas: QuotaConfig,
    friend_times: u32,
    timeouts: VerifyTimeouts,
    blacklist: BlacklistConfig,
    composer: CommentComposer,
}

impl Governor {
    pub fn new(store: Store, config: &GovernorConfig) -> Self {
        Self {
            store,
            profile_id: config.profile_id.clone(),
            quotas: config.quota.clone(),
            friend_times: config.friend_times,
            timeouts: config.verify.timeouts(),
            blacklist: config.blacklist.clone(),
            composer: CommentComposer::new(config.comments.clone()),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Send a friend request to `target` and verify it took effect.
    #[instrument(skip_all, fields(target = target))]
    pub fn friend<D: UiDriver, P: Pacer>(
        &self,
        driver: &mut D,
        pacer: &mut P,
        target: &str,
        surface: &ActionSurface,
    ) -> Outcome {
        if let Some(stop) = self.quota_gate(ActionKind::Friend) {
            return stop;
        }
        match self
            .store
            .is_eligible(&self.profile_id, target, self.friend_times)
        {
            Ok(true) => {}
            Ok(false) => {
                info!(limit = self.friend_times, "target already at friend limit");
                return Outcome::failed(Reason::AlreadyFriended);
            }
            Err(err) => return storage_failed(err),
        }
        self.run_graph_action(driver, pacer, ActionKind::Friend, target, surface, true)
    }

    /// Unfollow `target` and verify it took effect.
    ///
    /// Unfollows are not restriction-gated: undoing a relationship is safe to
    /// repeat, and the pre-action status read skips targets already undone.
    #[instrument(skip_all, fields(target = target))]
    pub fn unfollow<D: UiDriver, P: Pacer>(
        &self,
        driver: &mut D,
        pacer: &mut P,
        target: &str,
        surface: &ActionSurface,
    ) -> Outcome {
        if let Some(stop) = self.quota_gate(ActionKind::Unfollow) {
            return stop;
        }
        self.run_graph_action(driver, pacer, ActionKind::Unfollow, target, surface, false)
    }

    /// Compose and submit a comment addressed to `target`.
    #[instrument(skip_all, fields(target = target))]
    pub fn comment<D: UiDriver, P: Pacer>(
        &self,
        driver: &mut D,
        pacer: &mut P,
        target: &str,
        surface: &CommentSurface,
    ) -> Outcome {
        if let Some(stop) = self.quota_gate(ActionKind::Comment) {
            return stop;
        }
        let text = match self.composer.compose(target) {
            Ok(text) => text,
            Err(err) => {
                error!(error = %err, "comment composition failed");
                return Outcome::failed(Reason::Unexpected);
            }
        };
        match self.submit_comment(driver, &text, surface) {
            Ok(Verdict::Success) => {
                if self.blacklist.enabled
                    && let Err(err) = self.store.blacklist_add(
                        target,
                        &self.blacklist.campaign,
                        ActionKind::Comment,
                        Utc::now(),
                    )
                {
                    return storage_failed(err);
                }
                info!(comment = %text, "commented");
                pacer.action_delay(ActionKind::Comment);
                Outcome::success()
            }
            Ok(Verdict::Failed(reason)) => Outcome::failed(reason),
            Err(err) => driver_failed(ActionKind::Comment, err),
        }
    }

    /// Quota gate shared by all kinds. `Some` is the outcome to return
    /// without touching the UI.
    fn quota_gate(&self, kind: ActionKind) -> Option<Outcome> {
        let decision = self.store.check_and_consume(
            &self.profile_id,
            kind,
            self.quotas.for_kind(kind),
            Utc::now(),
        );
        match decision {
            Ok(QuotaDecision::Proceed) => None,
            Ok(QuotaDecision::Jump) => {
                info!(kind = kind.as_str(), "quota exhausted, jumping action");
                Some(Outcome::failed(Reason::Jumped))
            }
            Err(err) => Some(storage_failed(err)),
        }
    }

    fn run_graph_action<D: UiDriver, P: Pacer>(
        &self,
        driver: &mut D,
        pacer: &mut P,
        kind: ActionKind,
        target: &str,
        surface: &ActionSurface,
        track_restriction: bool,
    ) -> Outcome {
        match self.attempt_graph_action(driver, pacer, kind, surface) {
            Ok(Verdict::Success) => self.conclude(pacer, kind, target, track_restriction),
            Ok(Verdict::Failed(reason)) => Outcome::failed(reason),
            Err(err) => driver_failed(kind, err),
        }
    }

    fn attempt_graph_action<D: UiDriver, P: Pacer>(
        &self,
        driver: &mut D,
        pacer: &mut P,
        kind: ActionKind,
        surface: &ActionSurface,
    ) -> Result<Verdict, DriverError> {
        driver.navigate(&surface.page_url)?;
        if !driver.page_available()? {
            warn!(kind = kind.as_str(), "target page unavailable");
            return Ok(Verdict::Failed(Reason::TargetUnavailable));
        }
        let probes = ActionProbes {
            confirm: surface.confirm.clone(),
            revert: surface.actionable.clone(),
            confirm_dialog: surface.confirm_dialog.clone(),
        };

        // Pre-action status read; one reload with a longer wait before
        // declaring the control unreadable.
        let mut status = read_status(driver, &probes, self.timeouts.first)?;
        if status == Observation::Indeterminate {
            driver.reload()?;
            status = read_status(driver, &probes, self.timeouts.reload)?;
        }
        match status {
            Observation::Acted(_) => {
                // The desired terminal state already holds; record it as done
                // without clicking anything.
                info!(kind = kind.as_str(), "already in desired state");
                Ok(Verdict::Success)
            }
            Observation::Indeterminate => {
                warn!(kind = kind.as_str(), "unable to detect action status");
                Ok(Verdict::Failed(Reason::Unexpected))
            }
            Observation::NotActed(control) => {
                driver.click(&control)?;
                if let Some(dialog) = &probes.confirm_dialog {
                    dismiss_confirm_dialog(driver, dialog, self.timeouts.dialog)?;
                }
                let verification = verify_action(driver, pacer, &probes, &self.timeouts)?;
                Ok(match verification.outcome {
                    VerifyOutcome::Verified => Verdict::Success,
                    VerifyOutcome::Blocked => Verdict::Failed(Reason::TemporaryBlock),
                    VerifyOutcome::Unexpected => Verdict::Failed(Reason::Unexpected),
                })
            }
        }
    }

    fn submit_comment<D: UiDriver>(
        &self,
        driver: &mut D,
        text: &str,
        surface: &CommentSurface,
    ) -> Result<Verdict, DriverError> {
        driver.navigate(&surface.page_url)?;
        if !driver.page_available()? {
            return Ok(Verdict::Failed(Reason::TargetUnavailable));
        }
        if let Some(open) = &surface.open_section {
            match driver.locate(open)?.into_iter().next() {
                Some(button) => driver.click(&button)?,
                // Narrow windows hide the button; the input may still exist.
                None => warn!("comment button not found"),
            }
        }
        let mut input = None;
        for selector in &surface.inputs {
            if let Some(found) = driver.locate(selector)?.into_iter().next() {
                input = Some(found);
                break;
            }
        }
        let Some(input) = input else {
            warn!("no comment input element found");
            return Ok(Verdict::Failed(Reason::CommentingDisabled));
        };
        driver.submit_text(&input, text)?;
        Ok(Verdict::Success)
    }

    /// Persist a verified success: ledger row, restriction upsert, humanized
    /// delay. Invoked at most once per attempt.
    fn conclude<P: Pacer>(
        &self,
        pacer: &mut P,
        kind: ActionKind,
        target: &str,
        track_restriction: bool,
    ) -> Outcome {
        let now = Utc::now();
        if self.blacklist.enabled
            && let Err(err) = self
                .store
                .blacklist_add(target, &self.blacklist.campaign, kind, now)
        {
            return storage_failed(err);
        }
        if track_restriction
            && let Err(err) = self.store.record_success(&self.profile_id, target, now)
        {
            return storage_failed(err);
        }
        info!(kind = kind.as_str(), target, "action verified and recorded");
        pacer.action_delay(kind);
        Outcome::success()
    }
}

fn storage_failed(err: StoreError) -> Outcome {
    error!(error = %err, "storage unavailable, aborting attempt");
    Outcome::failed(Reason::StorageUnavailable)
}

fn driver_failed(kind: ActionKind, err: DriverError) -> Outcome {
    error!(kind = kind.as_str(), error = %err, "driver fault during attempt");
    match err {
        DriverError::NotInteractable => Outcome::failed(Reason::InvalidElementState),
        DriverError::Session(_) => Outcome::failed(Reason::CollaboratorFailure),
    }
}
