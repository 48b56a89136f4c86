//! Action-execution governor for automated social-graph actions.
//!
//! This crate decides *whether* an action (friend, unfollow, comment) may run,
//! *how* its effect is confirmed against a stateful web UI, and *what* is
//! persisted afterward. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (shared types, comment
//!   composition). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting boundaries (SQLite store, the UI driver trait,
//!   pacing sleeps). Isolated to enable scripted fakes in tests.
//!
//! Orchestration modules ([`actions`], [`verify`]) coordinate core logic with
//! I/O: quota gate, eligibility check, UI attempt, verification with bounded
//! retry, and ledger updates on verified success.

pub mod actions;
pub mod config;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod verify;
