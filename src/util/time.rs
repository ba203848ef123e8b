//! Nanosecond-resolution timestamps.

use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds since the Unix epoch, as a signed 64-bit count.
///
/// A plain newtype rather than a generic duration-parameterized point: the
/// only consumer in this crate (the primary-key id) needs nanosecond
/// resolution and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NanoTime(pub i64);

impl NanoTime {
    pub fn now() -> Self {
        let d = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the Unix epoch");
        Self(d.as_nanos() as i64)
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_positive_and_monotonic_ish() {
        let a = NanoTime::now();
        let b = NanoTime::now();
        assert!(a.0 > 0);
        assert!(b.0 >= a.0);
    }
}
