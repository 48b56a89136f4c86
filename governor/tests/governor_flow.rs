//! End-to-end governor flows over scripted collaborators: quota gate,
//! eligibility, verification retry, and persistence side effects.

use chrono::Utc;
use governor::actions::{ActionSurface, CommentSurface, Governor};
use governor::config::{GovernorConfig, QuotaConfig, QuotaLimit};
use governor::core::types::{ActionKind, Outcome, Reason};
use governor::io::driver::{DriverError, MatchHit, Selector};
use governor::io::store::Store;
use governor::test_support::{RecordingPacer, ScriptedDriver, break_store_table, handle};

fn config() -> GovernorConfig {
    GovernorConfig {
        quota: QuotaConfig {
            friends: Some(QuotaLimit {
                limit: 10,
                window_secs: 3600,
            }),
            unfollows: Some(QuotaLimit {
                limit: 10,
                window_secs: 3600,
            }),
            comments: Some(QuotaLimit {
                limit: 10,
                window_secs: 3600,
            }),
        },
        ..GovernorConfig::default()
    }
}

fn governor() -> Governor {
    Governor::new(Store::in_memory().expect("store"), &config())
}

fn friend_surface() -> ActionSurface {
    ActionSurface {
        page_url: "https://example.com/alice/".to_string(),
        actionable: vec![Selector::xpath("//button[text()='Add Friend']")],
        confirm: vec![Selector::xpath("//button[text()='Request Sent']")],
        confirm_dialog: None,
    }
}

fn comment_surface() -> CommentSurface {
    CommentSurface {
        page_url: "https://example.com/post/1".to_string(),
        open_section: Some(Selector::css("button.comment")),
        inputs: vec![
            Selector::xpath("//textarea[@placeholder='Add a comment']"),
            Selector::xpath("//input[@placeholder='Add a comment']"),
        ],
    }
}

/// Index of the first `confirm` selector in a combined status read.
const CONFIRM: usize = 0;
/// Index of the first `actionable`/revert selector in a combined status read.
const ACTIONABLE: usize = 1;

#[test]
fn friend_retry_succeeds_and_records_exactly_once() {
    let governor = governor();
    let mut driver = ScriptedDriver::default();
    // Pre-action status: the actionable control is present.
    driver.push_wait(Some(MatchHit {
        selector: ACTIONABLE,
        handle: handle(1, "Add Friend"),
    }));
    // First verification pass times out.
    driver.push_wait(None);
    // Reload shows the opposite state: the click did not take.
    driver.push_wait(Some(MatchHit {
        selector: ACTIONABLE,
        handle: handle(2, "Add Friend"),
    }));
    // Retry verification succeeds within the second timeout.
    driver.push_wait(Some(MatchHit {
        selector: CONFIRM,
        handle: handle(3, "Request Sent"),
    }));
    let mut pacer = RecordingPacer::default();

    let outcome = governor.friend(&mut driver, &mut pacer, "alice", &friend_surface());

    assert_eq!(outcome, Outcome::success());
    assert_eq!(outcome.reason.as_str(), "success");
    assert_eq!(driver.clicks.len(), 2);
    assert_eq!(driver.reloads, 1);

    // Exactly one ledger row and exactly one restriction increment.
    let entries = governor.store().blacklist_entries("default").expect("ledger");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].username, "alice");
    assert_eq!(entries[0].action, "friended");
    assert_eq!(
        governor.store().times_acted("default", "alice").expect("times"),
        1
    );
    assert_eq!(pacer.delays, vec![ActionKind::Friend]);
    assert_eq!(pacer.cooldowns, 0);
}

#[test]
fn friend_double_timeout_blocks_with_cooldown_and_no_mutation() {
    let governor = governor();
    let mut driver = ScriptedDriver::default();
    driver.push_wait(Some(MatchHit {
        selector: ACTIONABLE,
        handle: handle(1, "Add Friend"),
    }));
    driver.push_wait(None); // first verification times out
    driver.push_wait(Some(MatchHit {
        selector: ACTIONABLE,
        handle: handle(2, "Add Friend"),
    }));
    driver.push_wait(None); // retry verification times out
    let mut pacer = RecordingPacer::default();

    let outcome = governor.friend(&mut driver, &mut pacer, "alice", &friend_surface());

    assert_eq!(outcome, Outcome::failed(Reason::TemporaryBlock));
    assert_eq!(outcome.reason.as_str(), "temporary block");
    assert_eq!(pacer.cooldowns, 1);
    assert!(pacer.delays.is_empty());
    assert!(
        governor
            .store()
            .blacklist_entries("default")
            .expect("ledger")
            .is_empty()
    );
    assert_eq!(
        governor.store().times_acted("default", "alice").expect("times"),
        0
    );
}

#[test]
fn friend_already_in_desired_state_records_without_clicking() {
    let governor = governor();
    let mut driver = ScriptedDriver::default();
    driver.push_wait(Some(MatchHit {
        selector: CONFIRM,
        handle: handle(1, "Request Sent"),
    }));
    let mut pacer = RecordingPacer::default();

    let outcome = governor.friend(&mut driver, &mut pacer, "alice", &friend_surface());

    assert_eq!(outcome, Outcome::success());
    assert!(driver.clicks.is_empty());
    assert_eq!(
        governor.store().times_acted("default", "alice").expect("times"),
        1
    );
}

#[test]
fn friend_with_neither_signature_is_unexpected_after_one_reload() {
    let governor = governor();
    let mut driver = ScriptedDriver::default();
    driver.push_wait(None); // pre-action status read finds nothing
    driver.push_wait(None); // nor after the reload
    let mut pacer = RecordingPacer::default();

    let outcome = governor.friend(&mut driver, &mut pacer, "alice", &friend_surface());

    assert_eq!(outcome, Outcome::failed(Reason::Unexpected));
    assert_eq!(driver.reloads, 1);
    assert_eq!(pacer.cooldowns, 0);
    assert_eq!(
        governor.store().times_acted("default", "alice").expect("times"),
        0
    );
}

#[test]
fn friend_respects_per_kind_quota_window() {
    let cfg = GovernorConfig {
        quota: QuotaConfig {
            friends: Some(QuotaLimit {
                limit: 2,
                window_secs: 3600,
            }),
            ..QuotaConfig::default()
        },
        friend_times: 10,
        ..GovernorConfig::default()
    };
    let governor = Governor::new(Store::in_memory().expect("store"), &cfg);
    let mut pacer = RecordingPacer::default();

    for target in ["alice", "bob"] {
        let mut driver = ScriptedDriver::default();
        driver.push_wait(Some(MatchHit {
            selector: CONFIRM,
            handle: handle(1, "Request Sent"),
        }));
        let outcome = governor.friend(&mut driver, &mut pacer, target, &friend_surface());
        assert_eq!(outcome, Outcome::success());
    }

    // Third attempt in the same window jumps without touching the UI.
    let mut driver = ScriptedDriver::default();
    let outcome = governor.friend(&mut driver, &mut pacer, "carol", &friend_surface());
    assert_eq!(outcome, Outcome::failed(Reason::Jumped));
    assert_eq!(outcome.reason.as_str(), "jumped");
    assert_eq!(driver.calls, 0);
    assert_eq!(
        governor.store().times_acted("default", "carol").expect("times"),
        0
    );
}

#[test]
fn unfollow_dismisses_confirmation_dialog() {
    let governor = governor();
    let surface = ActionSurface {
        page_url: "https://example.com/bob/".to_string(),
        actionable: vec![Selector::xpath("//button[text()='Following']")],
        confirm: vec![Selector::xpath("//button[text()='Follow']")],
        confirm_dialog: Some(Selector::xpath("//button[text()='Unfollow']")),
    };
    let mut driver = ScriptedDriver::default();
    driver.push_wait(Some(MatchHit {
        selector: ACTIONABLE,
        handle: handle(1, "Following"),
    }));
    // Confirmation dialog pops up after the click.
    driver.push_wait(Some(MatchHit {
        selector: 0,
        handle: handle(2, "Unfollow"),
    }));
    // First verification pass succeeds.
    driver.push_wait(Some(MatchHit {
        selector: CONFIRM,
        handle: handle(3, "Follow"),
    }));
    let mut pacer = RecordingPacer::default();

    let outcome = governor.unfollow(&mut driver, &mut pacer, "bob", &surface);

    assert_eq!(outcome, Outcome::success());
    assert_eq!(driver.clicks, vec![handle(1, "Following"), handle(2, "Unfollow")]);
    // Unfollows are ledgered but not restriction-tracked.
    assert_eq!(
        governor.store().blacklist_entries("default").expect("ledger")[0].action,
        "unfollowed"
    );
    assert_eq!(
        governor.store().times_acted("default", "bob").expect("times"),
        0
    );
}

#[test]
fn comment_substitutes_name_and_ledgers_it() {
    let cfg = GovernorConfig {
        comments: vec!["Hey {{ name }}!".to_string()],
        ..config()
    };
    let governor = Governor::new(Store::in_memory().expect("store"), &cfg);
    let mut driver = ScriptedDriver::default();
    driver.push_locate(vec![handle(1, "Comment")]); // section button
    driver.push_locate(vec![handle(2, "")]); // textarea
    let mut pacer = RecordingPacer::default();

    let outcome = governor.comment(&mut driver, &mut pacer, "alice", &comment_surface());

    assert_eq!(outcome, Outcome::success());
    assert_eq!(driver.submissions, vec![(2, "Hey alice!".to_string())]);
    let entries = governor.store().blacklist_entries("default").expect("ledger");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "commented");
    assert_eq!(pacer.delays, vec![ActionKind::Comment]);
}

#[test]
fn comment_falls_back_to_second_input_selector() {
    let governor = governor();
    let mut driver = ScriptedDriver::default();
    driver.push_locate(vec![handle(1, "Comment")]); // section button
    driver.push_locate(Vec::new()); // textarea absent
    driver.push_locate(vec![handle(4, "")]); // input fallback
    let mut pacer = RecordingPacer::default();

    let outcome = governor.comment(&mut driver, &mut pacer, "alice", &comment_surface());

    assert_eq!(outcome, Outcome::success());
    assert_eq!(driver.submissions.len(), 1);
    assert_eq!(driver.submissions[0].0, 4);
}

#[test]
fn missing_comment_input_reports_disabled_but_quota_stays_burned() {
    let governor = governor();
    let mut driver = ScriptedDriver::default();
    driver.push_locate(Vec::new()); // no section button
    driver.push_locate(Vec::new()); // no textarea
    driver.push_locate(Vec::new()); // no input either
    let mut pacer = RecordingPacer::default();

    let outcome = governor.comment(&mut driver, &mut pacer, "alice", &comment_surface());

    assert_eq!(outcome, Outcome::failed(Reason::CommentingDisabled));
    assert_eq!(outcome.reason.as_str(), "commenting disabled");
    assert!(driver.submissions.is_empty());
    assert!(
        governor
            .store()
            .blacklist_entries("default")
            .expect("ledger")
            .is_empty()
    );
    // Quota is consumed before the attempt; the failed attempt still burned it.
    assert_eq!(
        governor
            .store()
            .quota_usage("default", ActionKind::Comment, 3600, Utc::now())
            .expect("usage"),
        1
    );
}

#[test]
fn storage_failure_aborts_before_touching_the_ui() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db_path = temp.path().join("governor.db");
    let governor = Governor::new(Store::open(&db_path).expect("open"), &config());
    // The eligibility read hits the missing table; the session must abort
    // rather than guess.
    break_store_table(&db_path, "restriction");
    let mut driver = ScriptedDriver::default();
    let mut pacer = RecordingPacer::default();

    let outcome = governor.friend(&mut driver, &mut pacer, "alice", &friend_surface());

    assert_eq!(outcome, Outcome::failed(Reason::StorageUnavailable));
    assert_eq!(outcome.reason.as_str(), "storage unavailable");
    assert_eq!(driver.calls, 0);
    assert!(pacer.delays.is_empty());
}

#[test]
fn storage_failure_during_quota_gate_jumps_no_further() {
    let temp = tempfile::tempdir().expect("tempdir");
    let db_path = temp.path().join("governor.db");
    let governor = Governor::new(Store::open(&db_path).expect("open"), &config());
    break_store_table(&db_path, "quota_counters");
    let mut driver = ScriptedDriver::default();
    let mut pacer = RecordingPacer::default();

    let outcome = governor.comment(&mut driver, &mut pacer, "alice", &comment_surface());

    assert_eq!(outcome, Outcome::failed(Reason::StorageUnavailable));
    assert_eq!(driver.calls, 0);
}

#[test]
fn rejected_text_injection_maps_to_invalid_element_state() {
    let governor = governor();
    let mut driver = ScriptedDriver::default();
    driver.push_locate(vec![handle(1, "Comment")]);
    driver.push_locate(vec![handle(2, "")]);
    driver.submit_error = Some(DriverError::NotInteractable);
    let mut pacer = RecordingPacer::default();

    let outcome = governor.comment(&mut driver, &mut pacer, "alice", &comment_surface());

    assert_eq!(outcome, Outcome::failed(Reason::InvalidElementState));
    assert_eq!(outcome.reason.as_str(), "invalid element state");
    assert!(
        governor
            .store()
            .blacklist_entries("default")
            .expect("ledger")
            .is_empty()
    );
}
