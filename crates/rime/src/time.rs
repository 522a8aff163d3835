use core::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

/// Custom epoch: Wednesday, January 1, 2025 00:00:00 UTC
///
/// All encoded timestamps are offsets from this instant. Anchoring the 41-bit
/// timestamp field to a recent date maximizes the usable lifetime of the
/// layout (roughly 69 years from the epoch).
pub const CUSTOM_EPOCH: Duration = Duration::from_millis(1_735_689_600_000);

/// [`CUSTOM_EPOCH`] in whole milliseconds, the unit the generator works in.
pub(crate) const CUSTOM_EPOCH_MS: u64 = CUSTOM_EPOCH.as_millis() as u64;

/// A source of wall-clock timestamps in whole milliseconds since the Unix
/// epoch.
///
/// This abstraction exists so that tests can inject fixed, stepping, or
/// regressing clocks. Production code uses [`WallClock`].
///
/// Implementations are expected to return values at or after
/// [`CUSTOM_EPOCH`]; earlier values cannot be represented in the ID layout.
///
/// # Example
///
/// ```
/// use rime::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1_735_689_600_042
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1_735_689_600_042);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn current_millis(&self) -> u64;
}

/// The default production time source, reading the system wall clock.
///
/// The generator's contract is defined in terms of the observed wall clock:
/// a backwards step must surface as [`Error::ClockRegression`] rather than
/// being smoothed away, so no monotonic ticker is layered on top.
///
/// [`Error::ClockRegression`]: crate::Error::ClockRegression
#[derive(Clone, Copy, Debug, Default)]
pub struct WallClock;

impl TimeSource for WallClock {
    fn current_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before UNIX_EPOCH")
            .as_millis() as u64
    }
}
