//! Operation Library
//!
//! Pure, stateless arithmetic used by the call handlers. Nothing here knows
//! about sessions, streams or transports; the protocol layer feeds values in
//! and ships results out.
//!
//! - [`sum`] and [`square_root`] back the unary calls.
//! - [`PrimeFactors`] yields factors one at a time for server streaming.
//! - [`RunningAverage`] and [`RunningMax`] are the per-call accumulators for
//!   client streaming and bidirectional streaming.

use thiserror::Error;

/// Rejected operand for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OperationError {
    /// Square root of a negative number.
    #[error("expected num >= 0, got {0}")]
    NegativeOperand(i32),
    /// Factorization of zero or a negative number.
    #[error("expected number > 0, got {0}")]
    NonPositiveOperand(i32),
}

impl OperationError {
    /// The offending operand.
    #[must_use]
    pub const fn operand(&self) -> i32 {
        match self {
            Self::NegativeOperand(n) | Self::NonPositiveOperand(n) => *n,
        }
    }
}

/// `a + b` with 32-bit two's complement wrap-around, matching `int32` on the wire.
#[must_use]
pub const fn sum(a: i32, b: i32) -> i32 {
    a.wrapping_add(b)
}

/// Square root of a non-negative number.
///
/// Negative input is rejected before any computation happens.
pub fn square_root(num: i32) -> Result<f64, OperationError> {
    if num < 0 {
        return Err(OperationError::NegativeOperand(num));
    }
    Ok(f64::from(num).sqrt())
}

/// Prime factors of a positive integer in ascending order, by trial division.
///
/// Repeated factors are yielded once per multiplicity (`8` yields `2, 2, 2`)
/// and `1` yields nothing.
///
/// ```rust
/// use calculator_service::domain::operations::PrimeFactors;
///
/// let factors: Vec<i32> = PrimeFactors::new(120).unwrap().collect();
/// assert_eq!(factors, vec![2, 2, 2, 3, 5]);
/// ```
#[derive(Debug, Clone)]
pub struct PrimeFactors {
    remaining: u32,
    candidate: u32,
}

impl PrimeFactors {
    /// Start factorizing `number`.
    pub const fn new(number: i32) -> Result<Self, OperationError> {
        if number < 1 {
            return Err(OperationError::NonPositiveOperand(number));
        }
        Ok(Self {
            remaining: number.unsigned_abs(),
            candidate: 2,
        })
    }
}

impl Iterator for PrimeFactors {
    type Item = i32;

    fn next(&mut self) -> Option<Self::Item> {
        while self.remaining > 1 {
            // No divisor up to sqrt(remaining): what is left is itself prime.
            if u64::from(self.candidate) * u64::from(self.candidate) > u64::from(self.remaining) {
                let factor = self.remaining;
                self.remaining = 1;
                return i32::try_from(factor).ok();
            }
            if self.remaining % self.candidate == 0 {
                self.remaining /= self.candidate;
                return i32::try_from(self.candidate).ok();
            }
            self.candidate += 1;
        }
        None
    }
}

/// Incremental arithmetic mean.
///
/// The total is kept in `f64` so long streams of `f32` values do not drift.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RunningAverage {
    total: f64,
    count: u64,
}

impl RunningAverage {
    /// Create an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            total: 0.0,
            count: 0,
        }
    }

    /// Fold one value into the mean.
    pub fn observe(&mut self, value: f32) {
        self.total += f64::from(value);
        self.count += 1;
    }

    /// Number of values observed.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Mean of the observed values, `None` if nothing was observed.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total / self.count as f64)
    }

    /// Mean as sent on the wire. An empty stream averages to `0.0`.
    #[must_use]
    pub fn result(&self) -> f32 {
        self.mean().map_or(0.0, |mean| mean as f32)
    }
}

/// Incremental maximum.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunningMax {
    max: Option<i32>,
}

impl RunningMax {
    /// Create an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self { max: None }
    }

    /// Fold one value in and return the maximum so far.
    pub fn observe(&mut self, value: i32) -> i32 {
        let max = self.max.map_or(value, |current| current.max(value));
        self.max = Some(max);
        max
    }

    /// Maximum so far, `None` before the first value.
    #[must_use]
    pub const fn current(&self) -> Option<i32> {
        self.max
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    fn is_prime(n: i32) -> bool {
        n >= 2 && (2..).take_while(|d| d * d <= n).all(|d| n % d != 0)
    }

    #[test]
    fn sum_adds_operands() {
        assert_eq!(sum(4, 6), 10);
        assert_eq!(sum(-4, 6), 2);
    }

    #[test]
    fn sum_wraps_like_int32() {
        assert_eq!(sum(i32::MAX, 1), i32::MIN);
    }

    #[test]
    fn square_root_of_perfect_square() {
        assert_eq!(square_root(81), Ok(9.0));
        assert_eq!(square_root(0), Ok(0.0));
    }

    #[test]
    fn square_root_rejects_negative_operand() {
        let err = square_root(-234).unwrap_err();
        assert_eq!(err, OperationError::NegativeOperand(-234));
        assert_eq!(err.operand(), -234);
        assert!(err.to_string().contains("-234"));
    }

    #[test_case(1, &[]; "one has no factors")]
    #[test_case(2, &[2]; "smallest prime")]
    #[test_case(8, &[2, 2, 2]; "repeated factor")]
    #[test_case(120, &[2, 2, 2, 3, 5]; "mixed factors")]
    #[test_case(97, &[97]; "prime input")]
    #[test_case(i32::MAX, &[i32::MAX]; "largest int32 is prime")]
    fn prime_factors(number: i32, expected: &[i32]) {
        let factors: Vec<i32> = PrimeFactors::new(number).unwrap().collect();
        assert_eq!(factors, expected);
    }

    #[test_case(0; "zero")]
    #[test_case(-12; "negative")]
    fn prime_factors_rejects_non_positive(number: i32) {
        assert_eq!(
            PrimeFactors::new(number).unwrap_err(),
            OperationError::NonPositiveOperand(number)
        );
    }

    #[test]
    fn running_average_of_example_sequence() {
        let mut avg = RunningAverage::new();
        for v in [5.0, 10.0, 6.0, 7.0, 9.0] {
            avg.observe(v);
        }
        assert_eq!(avg.count(), 5);
        assert!((avg.result() - 7.4).abs() < 1e-6);
    }

    #[test]
    fn running_average_empty_is_zero() {
        let avg = RunningAverage::new();
        assert_eq!(avg.mean(), None);
        assert_eq!(avg.result(), 0.0);
    }

    #[test]
    fn running_max_tracks_maximum() {
        let mut max = RunningMax::new();
        assert_eq!(max.current(), None);
        assert_eq!(max.observe(-5), -5);
        assert_eq!(max.observe(10), 10);
        assert_eq!(max.observe(6), 10);
        assert_eq!(max.current(), Some(10));
    }

    proptest! {
        #[test]
        fn square_root_squares_back(n in 0..=i32::MAX) {
            let v = square_root(n).unwrap();
            let n = f64::from(n);
            prop_assert!((v * v - n).abs() <= n.max(1.0) * 1e-12);
        }

        #[test]
        fn square_root_negative_always_fails(n in i32::MIN..0) {
            prop_assert_eq!(square_root(n), Err(OperationError::NegativeOperand(n)));
        }

        #[test]
        fn factors_multiply_back_and_are_prime(n in 1..2_000_000i32) {
            let factors: Vec<i32> = PrimeFactors::new(n).unwrap().collect();
            let product: i64 = factors.iter().map(|&f| i64::from(f)).product();
            prop_assert_eq!(product, i64::from(n));
            prop_assert!(factors.iter().all(|&f| is_prime(f)));
            prop_assert!(factors.windows(2).all(|w| w[0] <= w[1]));
        }

        #[test]
        fn running_average_matches_mean(values in prop::collection::vec(-1.0e6f32..1.0e6, 1..64)) {
            let mut avg = RunningAverage::new();
            for &v in &values {
                avg.observe(v);
            }
            let expected = values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64;
            prop_assert!((avg.mean().unwrap() - expected).abs() <= 1e-6 * expected.abs().max(1.0));
        }
    }
}
