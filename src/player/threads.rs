//! Render thread counts for the two player variants.

use std::num::NonZeroUsize;
use std::thread;

/// Returns the number of logical processors reported by the host, or 1 if
/// the host can't tell.
pub fn logical_processors() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Render threads for realtime playback on `processors` logical processors.
///
/// Half of the machine is left to the audio callback, the host and the OS,
/// minus one more for headroom, but never fewer than one thread.
pub fn realtime_thread_count(processors: usize) -> usize {
    (processors / 2).saturating_sub(1).max(1)
}

/// Render threads for pre-rendering: the whole machine.
pub fn prerender_thread_count(processors: usize) -> usize {
    processors.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realtime_thread_count() {
        assert_eq!(realtime_thread_count(0), 1);
        assert_eq!(realtime_thread_count(1), 1);
        assert_eq!(realtime_thread_count(2), 1);
        assert_eq!(realtime_thread_count(3), 1);
        assert_eq!(realtime_thread_count(4), 1);
        assert_eq!(realtime_thread_count(6), 2);
        assert_eq!(realtime_thread_count(8), 3);
        assert_eq!(realtime_thread_count(9), 3);
        assert_eq!(realtime_thread_count(64), 31);
    }

    #[test]
    fn test_realtime_matches_formula() {
        for p in 2..=256usize {
            let expected = ((p / 2) as i64 - 1).max(1) as usize;
            assert_eq!(realtime_thread_count(p), expected, "P = {}", p);
        }
    }

    #[test]
    fn test_prerender_uses_every_processor() {
        assert_eq!(prerender_thread_count(0), 1);
        for p in 1..=256 {
            assert_eq!(prerender_thread_count(p), p);
        }
    }

    #[test]
    fn test_logical_processors_nonzero() {
        assert!(logical_processors() >= 1);
    }
}
