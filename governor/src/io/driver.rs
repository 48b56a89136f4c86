//! UI driver abstraction for browser-level actions.
//!
//! The [`UiDriver`] trait decouples the governor from the actual browser
//! backend. Element lookup, clicking, navigation, and bounded waits are the
//! collaborator's job; the governor only decides what to ask for and how to
//! classify what came back. Tests use scripted drivers that return
//! predetermined observations without touching a browser.

use std::time::Duration;

use thiserror::Error;

/// Selector language understood by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind {
    Css,
    XPath,
}

/// One element lookup spec (supplied by the page-glue layer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub kind: SelectorKind,
    pub expr: String,
}

impl Selector {
    pub fn css(expr: impl Into<String>) -> Self {
        Self {
            kind: SelectorKind::Css,
            expr: expr.into(),
        }
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self {
            kind: SelectorKind::XPath,
            expr: expr.into(),
        }
    }
}

/// Opaque handle to a located element plus its visible text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub id: u64,
    pub text: String,
}

/// A successful bounded wait: which selector matched, and the element.
///
/// Carrying the index lets callers classify UI state from the match itself
/// instead of inferring meaning from which exception did not fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchHit {
    pub selector: usize,
    pub handle: ElementHandle,
}

/// Faults the driver can report. The governor maps these to reason codes;
/// they never escape its public boundary.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The element went stale or rejected interaction.
    #[error("element is stale or not interactable")]
    NotInteractable,

    /// The browser session itself failed (lost connection, crashed tab).
    #[error("browser session failure: {0}")]
    Session(String),
}

/// Abstraction over the browser/DOM collaborator.
pub trait UiDriver {
    /// Navigate the session's tab to `url`.
    fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    /// Whether the current page loaded as a real content page (not an error
    /// or "content unavailable" interstitial).
    fn page_available(&mut self) -> Result<bool, DriverError>;

    /// All elements currently matching `selector`, possibly none.
    fn locate(&mut self, selector: &Selector) -> Result<Vec<ElementHandle>, DriverError>;

    fn click(&mut self, handle: &ElementHandle) -> Result<(), DriverError>;

    /// Type `text` into the element and submit it.
    fn submit_text(&mut self, handle: &ElementHandle, text: &str) -> Result<(), DriverError>;

    /// Bounded poll until any of `selectors` matches a visible element or
    /// `timeout` elapses. Never a fixed sleep.
    fn wait_for_any(
        &mut self,
        selectors: &[Selector],
        timeout: Duration,
    ) -> Result<Option<MatchHit>, DriverError>;

    /// Refresh the current page.
    fn reload(&mut self) -> Result<(), DriverError>;
}
