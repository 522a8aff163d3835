use crate::{Error, Result, time::CUSTOM_EPOCH_MS};
use chrono::{DateTime, SecondsFormat, Utc};
use core::fmt;

/// A 64-bit Snowflake-style identifier.
///
/// The bit layout, from most to least significant:
///
/// ```text
/// +---+----------------+--------------+---------------+
/// | 0 | timestamp (41) | machine (10) | sequence (12) |
/// +---+----------------+--------------+---------------+
/// ```
///
/// - the reserved bit is always `0`, keeping every ID within the positive
///   range of a signed 64-bit integer for cross-language portability
/// - the timestamp field is milliseconds since [`CUSTOM_EPOCH`]
/// - the machine field identifies the generating node (assigned externally)
/// - the sequence field disambiguates IDs minted within one millisecond
///
/// IDs order by generation time first, then machine, then sequence, so the
/// natural integer ordering is also a (loose) chronological ordering.
///
/// # Example
///
/// ```
/// use rime::SnowflakeId;
///
/// let id = SnowflakeId::from_components(1000, 7, 3);
/// assert_eq!(id.timestamp(), 1000);
/// assert_eq!(id.machine_id(), 7);
/// assert_eq!(id.sequence(), 3);
/// ```
///
/// [`CUSTOM_EPOCH`]: crate::CUSTOM_EPOCH
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct SnowflakeId(u64);

impl SnowflakeId {
    /// Width of the timestamp field in bits.
    pub const TIMESTAMP_BITS: u32 = 41;
    /// Width of the machine ID field in bits.
    pub const MACHINE_ID_BITS: u32 = 10;
    /// Width of the sequence field in bits.
    pub const SEQUENCE_BITS: u32 = 12;

    /// Left shift applied to the timestamp during encoding.
    pub const TIMESTAMP_SHIFT: u32 = Self::MACHINE_ID_BITS + Self::SEQUENCE_BITS;
    /// Left shift applied to the machine ID during encoding.
    pub const MACHINE_ID_SHIFT: u32 = Self::SEQUENCE_BITS;

    /// Largest encodable timestamp offset.
    pub const MAX_TIMESTAMP: u64 = (1 << Self::TIMESTAMP_BITS) - 1;
    /// Largest valid machine ID.
    pub const MAX_MACHINE_ID: u64 = (1 << Self::MACHINE_ID_BITS) - 1;
    /// Largest sequence value within one millisecond.
    pub const MAX_SEQUENCE: u64 = (1 << Self::SEQUENCE_BITS) - 1;

    /// Packs the three fields into an ID.
    ///
    /// `timestamp` is milliseconds since [`CUSTOM_EPOCH`], not since the Unix
    /// epoch. Out-of-range components are a caller bug; they are checked in
    /// debug builds only, since the generator never produces them.
    ///
    /// [`CUSTOM_EPOCH`]: crate::CUSTOM_EPOCH
    pub fn from_components(timestamp: u64, machine_id: u64, sequence: u64) -> Self {
        debug_assert!(timestamp <= Self::MAX_TIMESTAMP);
        debug_assert!(machine_id <= Self::MAX_MACHINE_ID);
        debug_assert!(sequence <= Self::MAX_SEQUENCE);
        Self(
            (timestamp << Self::TIMESTAMP_SHIFT)
                | (machine_id << Self::MACHINE_ID_SHIFT)
                | sequence,
        )
    }

    /// Returns the ID for the given integer representation.
    ///
    /// This is a structural check, not a validity check: any integer with the
    /// reserved top bit clear decodes to *some* ID. A set top bit cannot have
    /// been produced by a generator and is rejected as
    /// [`Error::MalformedId`].
    pub fn from_raw(raw: u64) -> Result<Self> {
        if raw >> (Self::TIMESTAMP_BITS + Self::TIMESTAMP_SHIFT) != 0 {
            return Err(Error::MalformedId { raw });
        }
        Ok(Self(raw))
    }

    /// Returns the integer representation of this ID.
    #[inline]
    pub const fn to_raw(self) -> u64 {
        self.0
    }

    /// Milliseconds since [`CUSTOM_EPOCH`] at which this ID was minted.
    ///
    /// [`CUSTOM_EPOCH`]: crate::CUSTOM_EPOCH
    #[inline]
    pub const fn timestamp(self) -> u64 {
        self.0 >> Self::TIMESTAMP_SHIFT
    }

    /// The machine ID encoded in this ID.
    #[inline]
    pub const fn machine_id(self) -> u64 {
        (self.0 >> Self::MACHINE_ID_SHIFT) & Self::MAX_MACHINE_ID
    }

    /// The per-millisecond sequence number encoded in this ID.
    #[inline]
    pub const fn sequence(self) -> u64 {
        self.0 & Self::MAX_SEQUENCE
    }

    /// Absolute mint time in milliseconds since the Unix epoch.
    #[inline]
    pub const fn timestamp_unix_ms(self) -> u64 {
        self.timestamp() + CUSTOM_EPOCH_MS
    }

    /// Decodes this ID into its components for diagnostics.
    pub fn decode(self) -> IdParts {
        let timestamp_ms = self.timestamp_unix_ms();
        // A 41-bit offset from the 2025 epoch tops out around the year 2094,
        // well inside chrono's representable range.
        let utc = DateTime::<Utc>::from_timestamp_millis(timestamp_ms as i64)
            .expect("41-bit timestamp within chrono range");
        IdParts {
            id: self.0,
            timestamp_ms,
            machine_id: self.machine_id(),
            sequence: self.sequence(),
            iso8601_utc: utc.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

impl fmt::Display for SnowflakeId {
    /// Displays the ID as a decimal integer, the form used on the wire.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for SnowflakeId {
    /// Serializes the ID as its native integer representation.
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for SnowflakeId {
    /// Deserializes an ID from its native integer representation, rejecting
    /// values with the reserved top bit set.
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = u64::deserialize(deserializer)?;
        Self::from_raw(raw).map_err(serde::de::Error::custom)
    }
}

/// The decoded components of a [`SnowflakeId`].
///
/// `timestamp_ms` is absolute (Unix-epoch based); `iso8601_utc` renders the
/// same instant as an RFC 3339 calendar string in UTC with millisecond
/// precision.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IdParts {
    /// The raw 64-bit identifier.
    pub id: u64,
    /// Mint time in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// The generating node.
    pub machine_id: u64,
    /// Position within the mint millisecond.
    pub sequence: u64,
    /// Mint time as an RFC 3339 UTC string.
    pub iso8601_utc: String,
}
