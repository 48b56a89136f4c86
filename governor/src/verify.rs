//! Verification state machine: confirm an attempted UI action took effect,
//! with one bounded retry.
//!
//! A single verification pass is unreliable because the page may re-render
//! asynchronously after the click. The machine therefore escalates in stages:
//! a first bounded wait for the post-action signature, an explicit reload
//! with a fresh status read (the UI may have updated while the watched
//! element went stale), one re-invocation of the action, and a second, longer
//! wait. Only persistent failure after the retry is classified as a
//! temporary platform-side block, which triggers the cooldown timer.

use std::time::Duration;

use tracing::{info, warn};

use crate::io::driver::{DriverError, ElementHandle, Selector, UiDriver};
use crate::io::pacing::Pacer;

/// Selector signatures for verifying one action.
#[derive(Debug, Clone)]
pub struct ActionProbes {
    /// Signatures of the acted state (e.g. the control reads "Following").
    pub confirm: Vec<Selector>,
    /// Signatures of the not-yet-acted state (e.g. it still reads "Follow").
    pub revert: Vec<Selector>,
    /// Confirmation-dialog button some flows pop up after the click
    /// (unfollow). Absence of the dialog is never an error.
    pub confirm_dialog: Option<Selector>,
}

/// Bounded-wait budgets for the machine's stages.
#[derive(Debug, Clone, Copy)]
pub struct VerifyTimeouts {
    /// First wait for the post-action signature.
    pub first: Duration,
    /// Status re-read after the explicit reload.
    pub reload: Duration,
    /// Second verification wait after re-invoking the action.
    pub retry: Duration,
    /// Wait for the optional confirmation dialog.
    pub dialog: Duration,
}

/// States the machine passes through. Recorded in order so transition
/// properties are directly assertable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyState {
    Attempted,
    Verifying,
    Verified,
    Reloading,
    Recovering,
    Retrying,
    Blocked,
    Unexpected,
}

/// Terminal classification of one verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    Blocked,
    Unexpected,
}

/// Outcome plus the visited-state trace.
#[derive(Debug, Clone)]
pub struct Verification {
    pub outcome: VerifyOutcome,
    pub trace: Vec<VerifyState>,
}

/// Tagged result of one post-reload status read. Classification comes from
/// WHICH selector matched, never from sniffing driver faults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// The acted-state signature is present.
    Acted(ElementHandle),
    /// The not-yet-acted signature is present.
    NotActed(ElementHandle),
    /// Neither signature appeared within the wait budget.
    Indeterminate,
}

/// Read the current action status: one combined bounded wait over both
/// signature sets, classified by match index.
pub fn read_status<D: UiDriver>(
    driver: &mut D,
    probes: &ActionProbes,
    timeout: Duration,
) -> Result<Observation, DriverError> {
    let mut selectors = Vec::with_capacity(probes.confirm.len() + probes.revert.len());
    selectors.extend(probes.confirm.iter().cloned());
    selectors.extend(probes.revert.iter().cloned());
    let hit = driver.wait_for_any(&selectors, timeout)?;
    Ok(match hit {
        Some(hit) if hit.selector < probes.confirm.len() => Observation::Acted(hit.handle),
        Some(hit) => Observation::NotActed(hit.handle),
        None => Observation::Indeterminate,
    })
}

/// Click the confirmation-dialog button if it shows up within the budget.
pub fn dismiss_confirm_dialog<D: UiDriver>(
    driver: &mut D,
    dialog: &Selector,
    timeout: Duration,
) -> Result<(), DriverError> {
    if let Some(hit) = driver.wait_for_any(std::slice::from_ref(dialog), timeout)? {
        driver.click(&hit.handle)?;
    }
    Ok(())
}

/// Run the machine for an action that was just attempted (clicked) by the
/// caller. On `Blocked`, the pacer's cooldown has already been invoked when
/// this returns.
pub fn verify_action<D: UiDriver, P: Pacer>(
    driver: &mut D,
    pacer: &mut P,
    probes: &ActionProbes,
    timeouts: &VerifyTimeouts,
) -> Result<Verification, DriverError> {
    let mut trace = vec![VerifyState::Attempted, VerifyState::Verifying];

    if driver.wait_for_any(&probes.confirm, timeouts.first)?.is_some() {
        trace.push(VerifyState::Verified);
        return Ok(Verification {
            outcome: VerifyOutcome::Verified,
            trace,
        });
    }

    trace.push(VerifyState::Reloading);
    driver.reload()?;
    match read_status(driver, probes, timeouts.reload)? {
        Observation::Acted(_) => {
            // The server-side effect landed while the watched element went
            // stale; the reload just caught the UI up.
            info!("action verified after reloading the page");
            trace.push(VerifyState::Recovering);
            trace.push(VerifyState::Verified);
            Ok(Verification {
                outcome: VerifyOutcome::Verified,
                trace,
            })
        }
        Observation::NotActed(control) => {
            trace.push(VerifyState::Retrying);
            driver.click(&control)?;
            if let Some(dialog) = &probes.confirm_dialog {
                dismiss_confirm_dialog(driver, dialog, timeouts.dialog)?;
            }
            if driver.wait_for_any(&probes.confirm, timeouts.retry)?.is_some() {
                trace.push(VerifyState::Verified);
                Ok(Verification {
                    outcome: VerifyOutcome::Verified,
                    trace,
                })
            } else {
                warn!("second verification failed, assuming temporary block");
                trace.push(VerifyState::Blocked);
                pacer.cooldown();
                Ok(Verification {
                    outcome: VerifyOutcome::Blocked,
                    trace,
                })
            }
        }
        Observation::Indeterminate => {
            warn!("neither UI signature present after reload");
            trace.push(VerifyState::Unexpected);
            Ok(Verification {
                outcome: VerifyOutcome::Unexpected,
                trace,
            })
        }
    }
}
