//! Received-byte accounting for streamed response bodies.

/// Tracks bytes received against an optional declared total.
///
/// The reported percentage never decreases, stays below 100 while bytes are
/// still outstanding, and is exactly 100 once the declared length has arrived.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    received: u64,
    total: Option<u64>,
    last: Option<u8>,
}

impl ProgressTracker {
    pub fn new(total: Option<u64>) -> Self {
        Self {
            received: 0,
            // A zero length gives no meaningful ratio.
            total: total.filter(|t| *t > 0),
            last: None,
        }
    }

    /// Account for one chunk and return the updated percentage, if computable.
    pub fn advance(&mut self, chunk_len: usize) -> Option<u8> {
        self.received = self.received.saturating_add(chunk_len as u64);
        let total = self.total?;

        let raw = ((self.received as f64 / total as f64) * 100.0).round();
        let mut percent = raw.min(100.0) as u8;
        if self.received < total {
            percent = percent.min(99);
        }
        let percent = self.last.map_or(percent, |last| last.max(percent));
        self.last = Some(percent);
        Some(percent)
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn percent(&self) -> Option<u8> {
        self.last
    }

    /// Whether the declared length has been fully received.
    pub fn is_complete(&self) -> bool {
        matches!(self.total, Some(total) if self.received >= total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_halves() {
        let mut tracker = ProgressTracker::new(Some(1_000_000));
        assert_eq!(tracker.advance(500_000), Some(50));
        assert!(!tracker.is_complete());
        assert_eq!(tracker.advance(500_000), Some(100));
        assert!(tracker.is_complete());
        assert_eq!(tracker.received(), 1_000_000);
    }

    #[test]
    fn test_unknown_total() {
        let mut tracker = ProgressTracker::new(None);
        assert_eq!(tracker.advance(4096), None);
        assert_eq!(tracker.received(), 4096);
        assert!(!tracker.is_complete());

        let mut zero = ProgressTracker::new(Some(0));
        assert_eq!(zero.advance(10), None);
    }

    #[test]
    fn test_no_early_hundred() {
        let mut tracker = ProgressTracker::new(Some(1_000_000));
        assert_eq!(tracker.advance(999_990), Some(99));
        assert_eq!(tracker.advance(10), Some(100));
    }

    #[test]
    fn test_monotonic_over_uneven_chunks() {
        let total = 123_457u64;
        let mut tracker = ProgressTracker::new(Some(total));
        let mut previous = 0u8;
        let mut sent = 0u64;
        let sizes = [1usize, 7, 4096, 13, 65_536, 2, 9_999];
        let mut i = 0;
        while sent < total {
            let size = (sizes[i % sizes.len()] as u64).min(total - sent) as usize;
            sent += size as u64;
            let percent = tracker.advance(size).unwrap();
            assert!(percent >= previous);
            assert_eq!(percent == 100, sent == total);
            previous = percent;
            i += 1;
        }
        assert_eq!(tracker.percent(), Some(100));
    }

    #[test]
    fn test_overrun_caps_at_hundred() {
        let mut tracker = ProgressTracker::new(Some(100));
        assert_eq!(tracker.advance(250), Some(100));
    }
}
