//! Geometric problem size sweeps
//!
//! Each benchmark group runs its backends at `start, start*m, start*m², ...`
//! up to `end`. Sizes are computed with checked integer multiplication so the
//! number of points is exactly `floor(log_m(end / start)) + 1`.

use std::env;

use crate::error::{BenchError, Result};

/// Bounds of a geometric problem size progression.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SweepConfig {
    start: usize,
    end: usize,
    multiplier: usize,
}

impl SweepConfig {
    /// Vector addition: 2^4 to 2^28 elements, ×16 per step
    pub const ADDITION: Self = Self {
        start: 1 << 4,
        end: 1 << 28,
        multiplier: 1 << 4,
    };

    /// Matrix multiplication: 2^4 to 2^24 elements, ×16 per step
    pub const MATMUL: Self = Self {
        start: 1 << 4,
        end: 1 << 24,
        multiplier: 1 << 4,
    };

    /// Validate and build a sweep.
    pub fn new(start: usize, end: usize, multiplier: usize) -> Result<Self> {
        if start == 0 {
            return Err(BenchError::InvalidSweep("start must be at least 1".to_string()));
        }
        if start > end {
            return Err(BenchError::InvalidSweep(format!(
                "start {start} exceeds end {end}"
            )));
        }
        if multiplier < 2 {
            return Err(BenchError::InvalidSweep(format!(
                "multiplier must be greater than 1, got {multiplier}"
            )));
        }
        Ok(Self {
            start,
            end,
            multiplier,
        })
    }

    /// Override `default` from `<PREFIX>_START`, `<PREFIX>_END` and
    /// `<PREFIX>_MULTIPLIER`.
    ///
    /// Unset variables keep the default bound. Values accept plain integers
    /// (`_` separators allowed) or powers of two written `2^N`.
    pub fn from_env(prefix: &str, default: Self) -> Result<Self> {
        let read = |suffix: &str, fallback: usize| -> Result<usize> {
            let key = format!("{prefix}_{suffix}");
            match env::var(&key) {
                Ok(raw) => parse_size(&raw)
                    .ok_or_else(|| BenchError::InvalidSweep(format!("{key}={raw:?} is not a size"))),
                Err(_) => Ok(fallback),
            }
        };

        Self::new(
            read("START", default.start)?,
            read("END", default.end)?,
            read("MULTIPLIER", default.multiplier)?,
        )
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn multiplier(&self) -> usize {
        self.multiplier
    }

    /// Iterate over the sizes of the sweep in increasing order.
    pub fn sizes(&self) -> Sizes {
        Sizes {
            next: Some(self.start),
            end: self.end,
            multiplier: self.multiplier,
        }
    }

    /// Number of sizes the sweep yields.
    pub fn len(&self) -> usize {
        self.sizes().count()
    }

    /// Always false: a valid sweep contains at least `start`.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Iterator over the sizes of a [`SweepConfig`].
#[derive(Clone, Debug)]
pub struct Sizes {
    next: Option<usize>,
    end: usize,
    multiplier: usize,
}

impl Iterator for Sizes {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next.filter(|&size| size <= self.end)?;
        self.next = current.checked_mul(self.multiplier);
        Some(current)
    }
}

fn parse_size(raw: &str) -> Option<usize> {
    let cleaned: String = raw.trim().chars().filter(|&c| c != '_').collect();
    if let Some(exponent) = cleaned.strip_prefix("2^") {
        let exponent: u32 = exponent.parse().ok()?;
        return 1usize.checked_shl(exponent);
    }
    cleaned.parse().ok()
}

/// Side length of the largest square matrix with at most `size` elements.
pub fn square_order(size: usize) -> usize {
    let mut order = (size as f64).sqrt() as usize;
    while order.checked_mul(order).is_some_and(|sq| sq > size) {
        order -= 1;
    }
    while (order + 1).checked_mul(order + 1).is_some_and(|sq| sq <= size) {
        order += 1;
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serial_test::serial;

    #[test]
    fn small_sweep() {
        let sweep = SweepConfig::new(16, 256, 16).unwrap();
        assert_eq!(sweep.sizes().collect::<Vec<_>>(), vec![16, 256]);
    }

    #[test]
    fn default_sweeps() {
        let add: Vec<_> = SweepConfig::ADDITION.sizes().collect();
        assert_eq!(add.len(), 7);
        assert_eq!(add.first(), Some(&16));
        assert_eq!(add.last(), Some(&(1 << 28)));

        let matmul: Vec<_> = SweepConfig::MATMUL.sizes().collect();
        assert_eq!(matmul, vec![1 << 4, 1 << 8, 1 << 12, 1 << 16, 1 << 20, 1 << 24]);
    }

    #[test]
    fn end_not_on_progression() {
        let sweep = SweepConfig::new(3, 100, 4).unwrap();
        assert_eq!(sweep.sizes().collect::<Vec<_>>(), vec![3, 12, 48]);
    }

    #[test]
    fn single_point_sweep() {
        let sweep = SweepConfig::new(5, 5, 2).unwrap();
        assert_eq!(sweep.len(), 1);
    }

    #[test]
    fn rejects_invalid_bounds() {
        assert!(matches!(SweepConfig::new(0, 10, 2), Err(BenchError::InvalidSweep(_))));
        assert!(matches!(SweepConfig::new(10, 5, 2), Err(BenchError::InvalidSweep(_))));
        assert!(matches!(SweepConfig::new(1, 5, 1), Err(BenchError::InvalidSweep(_))));
    }

    #[test]
    fn stops_before_overflow() {
        let sweep = SweepConfig::new(usize::MAX / 2, usize::MAX, 4).unwrap();
        assert_eq!(sweep.len(), 1);
    }

    #[test]
    #[serial]
    fn from_env_overrides_bounds() {
        env::set_var("KERNELBENCH_TEST_SWEEP_START", "2^8");
        env::set_var("KERNELBENCH_TEST_SWEEP_END", "65_536");
        env::remove_var("KERNELBENCH_TEST_SWEEP_MULTIPLIER");

        let sweep = SweepConfig::from_env("KERNELBENCH_TEST_SWEEP", SweepConfig::ADDITION).unwrap();
        assert_eq!(sweep.start(), 256);
        assert_eq!(sweep.end(), 65_536);
        assert_eq!(sweep.multiplier(), 16);

        env::remove_var("KERNELBENCH_TEST_SWEEP_START");
        env::remove_var("KERNELBENCH_TEST_SWEEP_END");
    }

    #[test]
    #[serial]
    fn from_env_rejects_garbage() {
        env::set_var("KERNELBENCH_TEST_BAD_END", "lots");
        let result = SweepConfig::from_env("KERNELBENCH_TEST_BAD", SweepConfig::MATMUL);
        assert!(matches!(result, Err(BenchError::InvalidSweep(_))));
        env::remove_var("KERNELBENCH_TEST_BAD_END");
    }

    #[test]
    fn square_orders() {
        assert_eq!(square_order(0), 0);
        assert_eq!(square_order(16), 4);
        assert_eq!(square_order(17), 4);
        assert_eq!(square_order(1 << 24), 4096);
        assert_eq!(square_order(99), 9);
    }

    proptest! {
        #[test]
        fn sweep_count_matches_log_formula(start in 1usize..1000, factor in 1usize..100_000, multiplier in 2usize..20) {
            let end = start * factor;
            let sweep = SweepConfig::new(start, end, multiplier).unwrap();
            let sizes: Vec<_> = sweep.sizes().collect();

            // floor(log_m(end / start)) + 1, evaluated exactly
            let mut expected = 1;
            let mut bound = start;
            while bound * multiplier <= end {
                bound *= multiplier;
                expected += 1;
            }

            prop_assert_eq!(sizes.len(), expected);
            prop_assert_eq!(sizes[0], start);
            prop_assert!(*sizes.last().unwrap() <= end);
            prop_assert!(sizes.windows(2).all(|w| w[1] == w[0] * multiplier));
        }
    }
}
