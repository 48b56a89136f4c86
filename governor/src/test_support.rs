//! Test-only scripted collaborators.

use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use crate::core::types::ActionKind;
use crate::io::driver::{DriverError, ElementHandle, MatchHit, Selector, UiDriver};
use crate::io::pacing::Pacer;

/// Create a deterministic element handle.
pub fn handle(id: u64, text: &str) -> ElementHandle {
    ElementHandle {
        id,
        text: text.to_string(),
    }
}

/// Drop a table out from under an already-open file-backed store, so its
/// next query on that table fails.
pub fn break_store_table(path: &Path, table: &str) {
    let conn = rusqlite::Connection::open(path).expect("open second connection");
    conn.execute_batch(&format!("DROP TABLE {table};"))
        .expect("drop table");
}

/// Driver that replays queued observations and records every call.
///
/// `wait_for_any` and `locate` pop from their queues in call order; an empty
/// queue behaves as "nothing matched". Scripted errors, when set, fire on the
/// next call of the corresponding method.
#[derive(Default)]
pub struct ScriptedDriver {
    wait_results: VecDeque<Option<MatchHit>>,
    locate_results: VecDeque<Vec<ElementHandle>>,
    /// Result of the next `page_available` call. Defaults to available.
    pub unavailable: bool,
    /// Error injected into the next `submit_text` call.
    pub submit_error: Option<DriverError>,
    /// Error injected into the next `navigate` call.
    pub navigate_error: Option<DriverError>,

    pub navigations: Vec<String>,
    pub clicks: Vec<ElementHandle>,
    pub submissions: Vec<(u64, String)>,
    pub waits: Vec<(usize, Duration)>,
    pub reloads: u32,
    pub calls: u32,
}

impl ScriptedDriver {
    pub fn push_wait(&mut self, result: Option<MatchHit>) {
        self.wait_results.push_back(result);
    }

    pub fn push_locate(&mut self, result: Vec<ElementHandle>) {
        self.locate_results.push_back(result);
    }
}

impl UiDriver for ScriptedDriver {
    fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.calls += 1;
        if let Some(err) = self.navigate_error.take() {
            return Err(err);
        }
        self.navigations.push(url.to_string());
        Ok(())
    }

    fn page_available(&mut self) -> Result<bool, DriverError> {
        self.calls += 1;
        Ok(!self.unavailable)
    }

    fn locate(&mut self, _selector: &Selector) -> Result<Vec<ElementHandle>, DriverError> {
        self.calls += 1;
        Ok(self.locate_results.pop_front().unwrap_or_default())
    }

    fn click(&mut self, handle: &ElementHandle) -> Result<(), DriverError> {
        self.calls += 1;
        self.clicks.push(handle.clone());
        Ok(())
    }

    fn submit_text(&mut self, handle: &ElementHandle, text: &str) -> Result<(), DriverError> {
        self.calls += 1;
        if let Some(err) = self.submit_error.take() {
            return Err(err);
        }
        self.submissions.push((handle.id, text.to_string()));
        Ok(())
    }

    fn wait_for_any(
        &mut self,
        selectors: &[Selector],
        timeout: Duration,
    ) -> Result<Option<MatchHit>, DriverError> {
        self.calls += 1;
        self.waits.push((selectors.len(), timeout));
        Ok(self.wait_results.pop_front().unwrap_or(None))
    }

    fn reload(&mut self) -> Result<(), DriverError> {
        self.calls += 1;
        self.reloads += 1;
        Ok(())
    }
}

/// Pacer that records invocations instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingPacer {
    pub delays: Vec<ActionKind>,
    pub cooldowns: u32,
}

impl Pacer for RecordingPacer {
    fn action_delay(&mut self, kind: ActionKind) {
        self.delays.push(kind);
    }

    fn cooldown(&mut self) {
        self.cooldowns += 1;
    }
}
