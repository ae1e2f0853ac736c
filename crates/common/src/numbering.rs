//! Order and ticket number generation.
//!
//! Numbers look like `ORD-<timestamp>-<suffix>` and `TKT-<timestamp>-<suffix>`
//! where the timestamp is the creation instant in epoch milliseconds written in
//! uppercase base36, and the suffix is random uppercase base36. Uniqueness rests
//! on the entropy of the suffix; nothing checks for collisions.

use chrono::{DateTime, Utc};
use rand::Rng;

const BASE36_DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Prefix of order numbers
pub const ORDER_PREFIX: &str = "ORD";
/// Prefix of ticket numbers
pub const TICKET_PREFIX: &str = "TKT";
/// Random characters in an order number
pub const ORDER_SUFFIX_LEN: usize = 4;
/// Random characters in a ticket number
pub const TICKET_SUFFIX_LEN: usize = 6;

/// Produces human-readable order and ticket numbers
pub trait NumberGenerator: Send + Sync {
    fn order_number(&self, at: DateTime<Utc>) -> String;
    fn ticket_number(&self, at: DateTime<Utc>) -> String;
}

/// Timestamp plus thread-local random suffix
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomNumberGenerator;

impl RandomNumberGenerator {
    fn compose(prefix: &str, at: DateTime<Utc>, suffix_len: usize) -> String {
        let millis = u64::try_from(at.timestamp_millis()).unwrap_or(0);
        format!("{}-{}-{}", prefix, to_base36(millis), random_base36(suffix_len))
    }
}

impl NumberGenerator for RandomNumberGenerator {
    fn order_number(&self, at: DateTime<Utc>) -> String {
        Self::compose(ORDER_PREFIX, at, ORDER_SUFFIX_LEN)
    }

    fn ticket_number(&self, at: DateTime<Utc>) -> String {
        Self::compose(TICKET_PREFIX, at, TICKET_SUFFIX_LEN)
    }
}

/// Uppercase base36 representation of `value`
pub fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::with_capacity(13);
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(BASE36_DIGITS[rng.gen_range(0..BASE36_DIGITS.len())]))
        .collect()
}
