//! Integration tests for the reconnect backoff policy

use std::time::Duration;

use focal::client::ReconnectPolicy;
use proptest::prelude::*;

#[test]
fn test_delay_sequence_doubles_then_caps() {
    let policy = ReconnectPolicy::new(Duration::from_secs(1), Duration::from_secs(5), 5);

    let delays: Vec<u64> = (0..5).map(|n| policy.delay(n).as_secs()).collect();
    assert_eq!(delays, vec![1, 2, 4, 5, 5]);
}

#[test]
fn test_cap_never_exceeded_at_extreme_attempts() {
    let policy = ReconnectPolicy::new(Duration::from_secs(1), Duration::from_secs(10), 5);
    assert_eq!(policy.delay(100), Duration::from_secs(10));
    assert_eq!(policy.delay(u32::MAX), Duration::from_secs(10));
}

#[test]
fn test_attempt_budget() {
    let policy = ReconnectPolicy::new(Duration::from_secs(1), Duration::from_secs(5), 3);
    assert!(!policy.exhausted(0));
    assert!(!policy.exhausted(2));
    assert!(policy.exhausted(3));
    assert!(policy.exhausted(4));
    assert_eq!(policy.max_attempts(), 3);
}

#[test]
fn test_cap_below_base_is_raised_to_base() {
    let policy = ReconnectPolicy::new(Duration::from_secs(2), Duration::from_secs(1), 5);
    assert_eq!(policy.delay(0), Duration::from_secs(2));
    assert_eq!(policy.delay(9), Duration::from_secs(2));
}

proptest! {
    /// Delays are monotonically non-decreasing in the attempt number and
    /// always within [base.min(cap), cap].
    #[test]
    fn prop_delays_monotone_and_capped(
        base_ms in 1u64..5_000,
        cap_ms in 1u64..60_000,
        attempts in 1u32..32,
    ) {
        let base = Duration::from_millis(base_ms);
        let cap = Duration::from_millis(cap_ms);
        let policy = ReconnectPolicy::new(base, cap, 5);

        let mut prev = Duration::ZERO;
        for n in 0..attempts {
            let d = policy.delay(n);
            prop_assert!(d >= prev);
            prop_assert!(d <= cap.max(base));
            prop_assert!(d >= base.min(cap.max(base)));
            prev = d;
        }
    }
}
