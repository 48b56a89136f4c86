//! Side-effecting boundaries: persistent store, UI driver, pacing sleeps.

pub mod driver;
pub mod pacing;
pub mod store;
