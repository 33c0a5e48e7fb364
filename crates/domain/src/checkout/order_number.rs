//! Order number generation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generates a human-readable order number: a UTC date component plus a
/// random hex suffix, e.g. `ORD-20260806-3FA9C1`.
///
/// The number is not guaranteed unique by construction; the checkout
/// engine retries insertion on collision.
pub fn generate(now: DateTime<Utc>) -> String {
    let entropy = Uuid::new_v4().simple().to_string();
    format!(
        "ORD-{}-{}",
        now.format("%Y%m%d"),
        entropy[..6].to_uppercase()
    )
}
