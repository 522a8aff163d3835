use std::sync::{MutexGuard, PoisonError};

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All possible errors that `rime` can produce.
///
/// None of these are recovered internally. Each one propagates to the caller
/// as a typed failure so the surrounding service can decide policy (refuse to
/// serve, escalate, and so on).
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The configured machine ID does not fit the 10-bit field.
    ///
    /// Raised at construction time. A generator must not be used with an
    /// out-of-range machine ID, since the encoded ID would collide with
    /// another machine's namespace.
    #[error("machine ID {machine_id} is out of range (0..=1023)")]
    InvalidMachineId { machine_id: u64 },

    /// The wall clock is behind the last observed generation timestamp.
    ///
    /// Generating an ID with a regressed clock would break the monotonicity
    /// guarantee, so the call fails instead. No retry or clock-skew smoothing
    /// is attempted here; silently stalling could mask a misconfigured or
    /// virtualized clock.
    #[error("clock moved backwards: last observed {last_ms} ms, now {observed_ms} ms")]
    ClockRegression { last_ms: u64, observed_ms: u64 },

    /// The input is not a structurally valid ID (the reserved top bit is
    /// set).
    #[error("{raw} is not a structurally valid ID: reserved top bit is set")]
    MalformedId { raw: u64 },

    /// The operation failed due to a poisoned lock.
    ///
    /// This can happen if another thread panicked while holding the
    /// generator's lock.
    #[error("generator state lock poisoned")]
    LockPoisoned,
}

// Convert all poisoned lock errors to a simplified `LockPoisoned`
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
