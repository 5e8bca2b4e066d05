//! Pricing and payload limits

/// Price charged per pool inside a polygon.
pub const PRICE_PER_POOL: f64 = 0.02;

/// Displayed prices are rounded to this many decimal places.
pub const PRICE_DECIMALS: i32 = 2;

/// Upper bound on a batch list response body before it is rejected.
pub const MAX_BATCHES_RESPONSE_BYTES: usize = 16 * 1024 * 1024; // 16 MiB
