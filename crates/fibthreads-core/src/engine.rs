//! Sequence engine.
//!
//! The naive double recursion is intentional: the point of this crate is to
//! show how slow work behaves under each dispatch strategy, not to be fast.

use std::time::Instant;

use crate::domain::FibonacciResponse;

/// n-th Fibonacci number by plain recursion.
///
/// `n <= 0` is 0. Additions wrap once the value leaves `i64` (n > 92).
pub fn fib(n: i64) -> i64 {
    if n <= 0 {
        0
    } else if n == 1 {
        1
    } else {
        fib(n - 1).wrapping_add(fib(n - 2))
    }
}

/// Compute `fib(n)` and record how long it took.
///
/// Pure apart from the clock read and one trace event; safe to call from any
/// thread concurrently.
pub fn calculate(n: i64) -> FibonacciResponse {
    tracing::debug!(n, "fibonacci({n})");
    let started = Instant::now();
    let result = fib(n);
    let elapsed = started.elapsed().as_millis();

    FibonacciResponse::new(n, result, u64::try_from(elapsed).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(2, 1)]
    #[case(10, 55)]
    #[case(20, 6765)]
    fn known_values(#[case] n: i64, #[case] expected: i64) {
        assert_eq!(fib(n), expected);
    }

    #[rstest]
    #[case(-1)]
    #[case(-42)]
    #[case(i64::MIN)]
    fn negative_input_floors_at_zero(#[case] n: i64) {
        assert_eq!(calculate(n).result, 0);
    }

    #[test]
    fn follows_recurrence() {
        for n in 2..=25 {
            assert_eq!(
                calculate(n).result,
                calculate(n - 1).result + calculate(n - 2).result,
                "recurrence broken at n={n}"
            );
        }
    }

    #[test]
    fn calculate_ten() {
        let response = calculate(10);
        assert_eq!(response.n, 10);
        assert_eq!(response.result, 55);
    }

    #[test]
    fn repeated_calls_agree() {
        let first = calculate(22);
        let second = calculate(22);
        assert_eq!(first.n, second.n);
        assert_eq!(first.result, second.result);
    }
}
