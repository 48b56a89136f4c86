//! Stable exit codes for governor CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid config/arguments, or a storage failure.
pub const INVALID: i32 = 1;
/// `governor eligibility` found the target already at its per-target limit.
pub const INELIGIBLE: i32 = 2;
