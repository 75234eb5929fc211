//! Absolute per-operation deadlines.

use std::time::Duration;

use tokio::time::Instant;

/// Point in time by which an operation must finish.
///
/// A single deadline covers every backend call an operation makes, so a slow
/// content store eats into the budget left for the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn at(instant: Instant) -> Self {
        Self(instant)
    }

    pub fn from_now(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    pub fn instant(&self) -> Instant {
        self.0
    }

    /// Time left, zero once elapsed.
    pub fn remaining(&self) -> Duration {
        self.0.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn remaining_shrinks_to_zero() {
        let d = Deadline::from_now(Duration::from_millis(20));
        assert!(!d.is_expired());
        assert!(d.remaining() <= Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(d.is_expired());
        assert_eq!(d.remaining(), Duration::ZERO);
    }

    #[test]
    fn ordering_follows_instant() {
        let now = Instant::now();
        assert!(Deadline::at(now) < Deadline::at(now + Duration::from_secs(1)));
    }
}
