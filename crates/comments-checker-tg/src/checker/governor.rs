use std::time::Duration;

/// Pauses between the calls to the channel directory. Bigger batches are
/// checked slower, because Telegram punishes bots that send a lot of requests
/// over a long period of time with long flood waits.
///
/// Each entry is a max batch size and the delay used for it. The last tier
/// covers all bigger batches.
const TIERS: &[(usize, Duration)] = &[
    (30, Duration::from_secs(1)),
    (90, Duration::from_secs(2)),
    (150, Duration::from_secs(3)),
    (usize::MAX, Duration::from_secs(5)),
];

/// Returns the delay to wait before the next call to the channel directory.
/// The first call of the run is never delayed.
pub(crate) fn next_delay(batch_size: usize, calls_made: usize) -> Duration {
    if calls_made == 0 {
        return Duration::ZERO;
    }

    TIERS
        .iter()
        .find(|(max_batch_size, _)| batch_size <= *max_batch_size)
        .map(|(_, delay)| *delay)
        .unwrap_or(Duration::ZERO)
}
