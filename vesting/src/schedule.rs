//! Release schedule arithmetic
//!
//! A schedule splits an allocation into a locked portion, paid as a single
//! cliff at `unlock_time`, and a vesting portion paid linearly between
//! `unlock_time` and `end_time`. Both amounts are pure functions of the
//! query time and non-decreasing in it. Interpolation floors, so rounding
//! under-releases and the remainder arrives with later queries.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schedule {
    pub locked_portion: u128,
    pub vesting_portion: u128,
    pub unlock_time: u64,
    pub end_time: u64,
}

impl Schedule {
    /// Portion of `vesting_portion` accrued at `now`. Zero until the cliff,
    /// the full portion from `end_time` on, linear in between.
    pub fn vested_amount(&self, now: u64) -> u128 {
        if now <= self.unlock_time {
            return 0;
        }
        if now >= self.end_time {
            return self.vesting_portion;
        }
        let elapsed = (now - self.unlock_time) as u128;
        let window = (self.end_time - self.unlock_time) as u128;
        // Exact floor of portion * elapsed / window, split so neither product
        // can exceed u128: the quotient term is below the portion, and the
        // remainder term multiplies two values below 2^64.
        let quotient = self.vesting_portion / window;
        let remainder = self.vesting_portion % window;
        quotient * elapsed + remainder * elapsed / window
    }

    /// Everything claimable at `now`: nothing before the cliff, the locked
    /// portion plus accrued vesting from the cliff on.
    pub fn releasable_amount(&self, now: u64) -> u128 {
        if now < self.unlock_time {
            return 0;
        }
        self.locked_portion + self.vested_amount(now)
    }

    pub fn total(&self) -> u128 {
        self.locked_portion + self.vesting_portion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MONTH: u64 = 30 * 86400;

    fn schedule(trigger: u64) -> Schedule {
        // 1,000,000 tokens, 10% locked, 6 month cliff, vested at 30 months.
        Schedule {
            locked_portion: 100_000,
            vesting_portion: 900_000,
            unlock_time: trigger + 6 * MONTH,
            end_time: trigger + 30 * MONTH,
        }
    }

    #[test]
    fn test_nothing_before_cliff() {
        let s = schedule(1_000_000);
        assert_eq!(s.releasable_amount(0), 0);
        assert_eq!(s.releasable_amount(1_000_000), 0);
        assert_eq!(s.releasable_amount(s.unlock_time - 1), 0);
        assert_eq!(s.vested_amount(s.unlock_time), 0);
    }

    #[test]
    fn test_cliff_pays_locked_portion() {
        let s = schedule(1_000_000);
        assert_eq!(s.releasable_amount(s.unlock_time), 100_000);
    }

    #[test]
    fn test_linear_interpolation_floors() {
        let s = Schedule {
            locked_portion: 0,
            vesting_portion: 10,
            unlock_time: 0,
            end_time: 3,
        };
        // 10 * 1 / 3 = 3 (floored), 10 * 2 / 3 = 6 (floored)
        assert_eq!(s.vested_amount(1), 3);
        assert_eq!(s.vested_amount(2), 6);
        assert_eq!(s.vested_amount(3), 10);
    }

    #[test]
    fn test_full_amount_at_and_after_end() {
        let s = schedule(1_000_000);
        assert_eq!(s.releasable_amount(s.end_time), 1_000_000);
        assert_eq!(s.releasable_amount(s.end_time + 1), 1_000_000);
        assert_eq!(s.releasable_amount(u64::MAX), 1_000_000);
    }

    #[test]
    fn test_interpolation_handles_maximal_portions() {
        let s = Schedule {
            locked_portion: 0,
            vesting_portion: u128::MAX - 1,
            unlock_time: 0,
            end_time: u64::MAX,
        };
        let mid = s.vested_amount(u64::MAX / 2);
        assert!(mid > 0 && mid < s.vesting_portion);
        assert_eq!(s.vested_amount(u64::MAX), u128::MAX - 1);

        let even = Schedule {
            locked_portion: 0,
            vesting_portion: u128::MAX - 1,
            unlock_time: 0,
            end_time: 2,
        };
        assert_eq!(even.vested_amount(1), (u128::MAX - 1) / 2);
    }

    #[test]
    fn test_monotonic_over_random_samples() {
        use rand::Rng;

        let s = schedule(1_714_521_600);
        let mut rng = rand::rng();
        for _ in 0..1000 {
            let a = rng.random_range(0..s.end_time + 2 * MONTH);
            let b = rng.random_range(a..=s.end_time + 2 * MONTH);
            assert!(s.vested_amount(a) <= s.vested_amount(b));
            assert!(s.releasable_amount(a) <= s.releasable_amount(b));
        }
    }
}
