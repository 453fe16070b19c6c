//! Wall-clock timestamps.

/// Current wall-clock time in microseconds since the Unix epoch.
///
/// All persisted timestamps (`created_at_us`, `updated_at_us`) come from
/// here, so event ordering across clients is only as good as their clocks;
/// within one store, ties are broken by append order.
#[must_use]
pub fn now_us() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

#[cfg(test)]
mod tests {
    use super::now_us;

    #[test]
    fn now_is_after_2020() {
        // 2020-01-01T00:00:00Z in microseconds.
        assert!(now_us() > 1_577_836_800_000_000);
    }
}
