use std::time::Duration;

/// Whole seconds of `duration` as a signed UTC offset, saturating at `i64::MAX`.
pub fn whole_secs(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturates_instead_of_wrapping() {
        assert_eq!(whole_secs(Duration::from_secs(900)), 900);
        assert_eq!(whole_secs(Duration::from_secs(u64::MAX)), i64::MAX);
        assert!(100_000 - whole_secs(Duration::from_secs(u64::MAX)) < 0);
    }
}
