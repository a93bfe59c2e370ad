use std::collections::VecDeque;

use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Uniform};

use crate::error::DiceError;

#[derive(Debug)]
pub struct Roller {
    rng: StdRng,
    scripted: VecDeque<u32>,
}

impl Roller {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let rng = StdRng::from_os_rng();
        Roller {
            rng,
            scripted: VecDeque::new(),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        let rng = StdRng::seed_from_u64(seed);
        Roller {
            rng,
            scripted: VecDeque::new(),
        }
    }

    /// A roller that returns `values` in order before falling back to a fixed seed.
    /// Scripted values are returned as-is, whatever the die size.
    pub fn scripted(values: impl IntoIterator<Item = u32>) -> Self {
        let mut roller = Self::from_seed(0);
        roller.scripted.extend(values);
        roller
    }

    pub fn roll_die(&mut self, die_size: u32) -> Result<u32, DiceError> {
        if let Some(value) = self.scripted.pop_front() {
            return Ok(value);
        }
        let die =
            Uniform::new_inclusive(1, die_size).map_err(|_| DiceError::InvalidDie(die_size))?;
        Ok(die.sample(&mut self.rng))
    }

    #[cfg(test)]
    pub fn test_rng() -> Self {
        Self::from_seed(42)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_values_come_first() {
        let mut roller = Roller::scripted([20, 1]);
        assert_eq!(roller.roll_die(20).unwrap(), 20);
        assert_eq!(roller.roll_die(20).unwrap(), 1);
        let next = roller.roll_die(6).unwrap();
        assert!((1..=6).contains(&next));
    }

    #[test]
    fn test_seeded_rollers_agree() {
        let mut a = Roller::from_seed(7);
        let mut b = Roller::from_seed(7);
        for _ in 0..100 {
            assert_eq!(a.roll_die(20).unwrap(), b.roll_die(20).unwrap());
        }
    }

    #[test]
    fn test_zero_sided_die_errors() {
        let mut roller = Roller::test_rng();
        assert!(roller.roll_die(0).is_err());
    }
}
