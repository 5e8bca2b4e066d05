//! Timer and timeout configuration

/// Reconciliation period used when nothing overrides it.
pub const DEFAULT_RECONCILE_INTERVAL_MS: u64 = 5_000;

/// Shortest period accepted from configuration; anything lower is a typo.
pub const MIN_RECONCILE_INTERVAL_MS: u64 = 100;

/// Per-request HTTP timeout.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;

/// Connection establishment timeout.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3_000;
