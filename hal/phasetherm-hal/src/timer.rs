//! Time and zero-cross edge sources

/// Timestamp in microseconds since boot
pub type Instant = u64;

/// Monotonic microsecond clock
///
/// Successive reads never decrease. Implementations on the RP2040 wrap the
/// 64-bit system timer, which does not overflow in practice.
pub trait Monotonic {
    /// Current time in microseconds
    fn now(&self) -> Instant;
}

/// Zero-cross detector exposed as a hardware edge counter
///
/// The counter increments once per rising edge of the detector output and
/// wraps at `u32::MAX`; consumers compare counts with `wrapping_sub`.
pub trait ZeroCrossTimer: Monotonic {
    /// Number of rising edges seen since the counter was started
    fn edge_count(&self) -> u32;
}

/// Number of edges between two counter readings, tolerant of wrap-around
pub fn edges_between(previous: u32, current: u32) -> u32 {
    current.wrapping_sub(previous)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges_between_wraps() {
        assert_eq!(edges_between(10, 13), 3);
        assert_eq!(edges_between(u32::MAX, 1), 2);
        assert_eq!(edges_between(7, 7), 0);
    }
}
