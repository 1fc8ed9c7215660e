use serde::{Deserialize, Serialize};
use std::fmt;

/// Round counter of the evaluation engine. One tick is one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SimTime(u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    pub fn new(ticks: u64) -> Self {
        SimTime(ticks)
    }

    pub fn ticks(&self) -> u64 {
        self.0
    }

    pub fn inc(&mut self) {
        self.0 = self.0.saturating_add(1);
    }

    /// The time `delay` rounds from now, saturating at the far end.
    pub fn after(&self, delay: u64) -> Self {
        SimTime(self.0.saturating_add(delay))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T={}", self.0)
    }
}

impl From<u64> for SimTime {
    fn from(value: u64) -> Self {
        SimTime::new(value)
    }
}

impl From<SimTime> for u64 {
    fn from(value: SimTime) -> Self {
        value.ticks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_and_advance() {
        let mut t = SimTime::ZERO;
        t.inc();
        assert_eq!(t.ticks(), 1);
        assert!(SimTime::ZERO < t);
        assert_eq!(t.after(4), SimTime::new(5));
        assert_eq!(SimTime::new(u64::MAX).after(1), SimTime::new(u64::MAX));
        assert_eq!(format!("{}", t), "T=1");
    }
}
