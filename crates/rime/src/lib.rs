//! Snowflake-style 64-bit ID generation.
//!
//! A [`SnowflakeGenerator`] mints globally unique, time-ordered identifiers
//! with no coordination between nodes beyond each one being assigned a
//! distinct machine ID. Every ID packs a millisecond timestamp (offset from
//! [`CUSTOM_EPOCH`]), the 10-bit machine ID, and a 12-bit per-millisecond
//! sequence counter behind a reserved zero top bit.
//!
//! Generation is serialized through one internal lock per instance; decoding
//! with [`SnowflakeId::decode`] is pure and needs no lock.
//!
//! # Example
//!
//! ```
//! use rime::{SnowflakeGenerator, WallClock};
//!
//! let generator = SnowflakeGenerator::new(42, WallClock)?;
//!
//! let id = generator.generate()?;
//! let parts = id.decode();
//! assert_eq!(parts.machine_id, 42);
//! # Ok::<(), rime::Error>(())
//! ```

mod error;
mod generator;
mod id;
mod time;

pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::time::*;
