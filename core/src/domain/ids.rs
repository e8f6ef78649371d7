//! Deterministic ID types using BLAKE3, plus sequential counters.
//!
//! - `ConfigHash`: content-addressable hash of a run's configuration.
//! - `RunId`: unique identifier for a single backtest run.
//! - `CandidateId`, `PositionId`: sequential counters, monotonic within a run.

use serde::{Deserialize, Serialize};
use std::fmt;

// ── Sequential ID types ──────────────────────────────────────────────

macro_rules! seq_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

seq_id!(CandidateId);
seq_id!(PositionId);

/// Monotonically increasing ID generator, private to the runner.
#[derive(Debug, Default)]
pub struct IdGen {
    next_candidate: u64,
    next_position: u64,
}

impl IdGen {
    /// Rebuild a generator that continues after the highest ids already
    /// written to durable storage, for checkpoint/resume.
    pub fn resume(next_candidate: u64, next_position: u64) -> Self {
        Self {
            next_candidate,
            next_position,
        }
    }

    pub fn next_candidate_id(&mut self) -> CandidateId {
        let id = CandidateId(self.next_candidate);
        self.next_candidate += 1;
        id
    }

    pub fn next_position_id(&mut self) -> PositionId {
        let id = PositionId(self.next_position);
        self.next_position += 1;
        id
    }
}

// ── BLAKE3-based hash types ──────────────────────────────────────────

/// 32-byte BLAKE3 hash wrapper with hex display and serde as hex string.
macro_rules! hash_id {
    ($name:ident) => {
        #[derive(Clone, PartialEq, Eq, Hash)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub fn from_bytes(data: &[u8]) -> Self {
                Self(*blake3::hash(data).as_bytes())
            }

            pub fn as_hex(&self) -> String {
                self.0.iter().map(|b| format!("{b:02x}")).collect()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.as_hex()[..16])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.as_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_str(&self.as_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let hex = String::deserialize(d)?;
                let bytes: Vec<u8> = (0..hex.len())
                    .step_by(2)
                    .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
                    .collect::<Result<_, _>>()
                    .map_err(serde::de::Error::custom)?;
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| serde::de::Error::custom("expected 32 bytes"))?;
                Ok(Self(arr))
            }
        }
    };
}

hash_id!(ConfigHash);
hash_id!(RunId);
