//! Cache Entry Module
//!
//! On-disk entry framing: an 8-byte expiration header followed by the raw
//! payload. Also holds the clock abstraction the TTL checks read from.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{Duration, Utc};

/// Size of the expiration header in bytes
pub const HEADER_LEN: usize = 8;

// == Expiration ==
/// Absolute point (unix seconds) at or after which an entry is expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Expires at the given unix timestamp
    At(i64),
    /// Never expires; encoded as `i64::MAX`
    Never,
}

impl Expiration {
    // == From TTL ==
    /// Computes the expiration for a TTL starting at `now`.
    ///
    /// A zero TTL never expires. A negative TTL lands in the past, so the
    /// entry is already expired when written.
    pub fn from_ttl(now: i64, ttl: Duration) -> Self {
        let secs = ttl.num_seconds();
        if secs == 0 {
            return Expiration::Never;
        }
        if secs > 0 {
            now.checked_add(secs)
                .filter(|at| *at != i64::MAX)
                .map_or(Expiration::Never, Expiration::At)
        } else {
            Expiration::At(now.saturating_add(secs))
        }
    }

    // == Is Expired ==
    /// Checks whether the entry is expired at `now`.
    ///
    /// Boundary condition: expired once `now >= expiration`.
    pub fn is_expired(&self, now: i64) -> bool {
        match self {
            Expiration::At(at) => now >= *at,
            Expiration::Never => false,
        }
    }

    /// Raw header timestamp.
    pub fn timestamp(&self) -> i64 {
        match self {
            Expiration::At(at) => *at,
            Expiration::Never => i64::MAX,
        }
    }

    pub fn from_timestamp(ts: i64) -> Self {
        if ts == i64::MAX {
            Expiration::Never
        } else {
            Expiration::At(ts)
        }
    }

    /// Encodes the header as little-endian bytes.
    pub fn to_header(&self) -> [u8; HEADER_LEN] {
        self.timestamp().to_le_bytes()
    }

    /// Decodes a header; `None` if fewer than 8 bytes are given.
    pub fn from_header(bytes: &[u8]) -> Option<Self> {
        let header: [u8; HEADER_LEN] = bytes.get(..HEADER_LEN)?.try_into().ok()?;
        Some(Self::from_timestamp(i64::from_le_bytes(header)))
    }
}

// == Clock ==
/// Source of "now" for TTL checks, in unix seconds.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Manually advanced clock for simulated time.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

// == Framing ==
/// Builds the full file contents for an entry.
pub fn encode_entry(expiration: Expiration, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(&expiration.to_header());
    buf.extend_from_slice(payload);
    buf
}

/// Splits file contents into expiration and payload.
pub fn decode_entry(bytes: &[u8]) -> Option<(Expiration, &[u8])> {
    let expiration = Expiration::from_header(bytes)?;
    Some((expiration, &bytes[HEADER_LEN..]))
}
