// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::random::Random;
use std::thread;
use std::time::Duration;

/// Squares `x` after a random delay, failing with probability `failure_rate`
pub fn square(
    random: &dyn Random,
    x: u64,
    failure_rate: f32,
    max_delay_ms: u32,
) -> Result<u64, String> {
    if max_delay_ms > 0 {
        let delay = random.u32(0..max_delay_ms);
        thread::sleep(Duration::from_millis(u64::from(delay)));
    }
    if random.f32() < failure_rate {
        return Err(format!("injected failure for {}", x));
    }
    x.checked_mul(x)
        .ok_or_else(|| format!("square of {} does not fit in 64 bits", x))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRandom(f32);

    impl Random for FixedRandom {
        fn u32(&self, range: std::ops::Range<u32>) -> u32 {
            range.start
        }
        fn f32(&self) -> f32 {
            self.0
        }
    }

    #[test]
    fn test_square() {
        assert_eq!(square(&FixedRandom(0.9), 7, 0.5, 5), Ok(49));
    }

    #[test]
    fn test_square_injected_failure() {
        let result = square(&FixedRandom(0.1), 7, 0.5, 0);
        assert_eq!(result, Err("injected failure for 7".to_string()));
    }

    #[test]
    fn test_square_overflow_is_an_error() {
        let result = square(&FixedRandom(0.9), 1 << 32, 0.0, 0);
        assert_eq!(
            result,
            Err("square of 4294967296 does not fit in 64 bits".to_string())
        );

        let largest = u64::from(u32::MAX);
        assert_eq!(square(&FixedRandom(0.9), largest, 0.0, 0), Ok(18446744065119617025));
    }

    #[test]
    fn test_square_never_fails_at_zero_rate() {
        assert!(square(&FixedRandom(0.0), 3, 0.0, 0).is_ok());
    }
}
