//! Reward value object

use std::ops::Add;

use serde::{Deserialize, Serialize};

/// Experience and currency paid out together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reward {
    pub xp: i64,
    pub coins: i64,
}

impl Reward {
    pub const ZERO: Reward = Reward { xp: 0, coins: 0 };

    pub fn new(xp: i64, coins: i64) -> Self {
        Self { xp, coins }
    }

    /// Apply a reward multiplier.
    ///
    /// Each component is rounded half away from zero to whole units, which
    /// is the ledger's currency policy.
    pub fn scaled(self, multiplier: f64) -> Self {
        Self {
            xp: scale_units(self.xp, multiplier),
            coins: scale_units(self.coins, multiplier),
        }
    }

    pub fn is_negative(&self) -> bool {
        self.xp < 0 || self.coins < 0
    }
}

impl Add for Reward {
    type Output = Reward;

    fn add(self, rhs: Self) -> Self::Output {
        Reward {
            xp: self.xp + rhs.xp,
            coins: self.coins + rhs.coins,
        }
    }
}

fn scale_units(units: i64, multiplier: f64) -> i64 {
    (units as f64 * multiplier).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_multiplier_keeps_reward() {
        assert_eq!(Reward::new(120, 40).scaled(1.0), Reward::new(120, 40));
    }

    #[test]
    fn scaling_rounds_half_away_from_zero() {
        // 25 * 1.1 = 27.5 -> 28, 15 * 1.1 = 16.5 -> 17
        assert_eq!(Reward::new(25, 15).scaled(1.1), Reward::new(28, 17));
        assert_eq!(Reward::new(100, 10).scaled(1.32), Reward::new(132, 13));
    }

    #[test]
    fn rewards_add_componentwise() {
        assert_eq!(Reward::new(1, 2) + Reward::new(3, 4), Reward::new(4, 6));
    }
}
