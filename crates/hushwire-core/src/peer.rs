//! Peer identifiers.

use std::{fmt, num::ParseIntError, str::FromStr};

/// Opaque, stable identifier of a remote party, supplied by the transport.
///
/// The sole lookup key for directory records and session keys. Signed
/// because transports commonly use negative ids for group chats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(i64);

impl PeerId {
    /// Wrap a transport-assigned id.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw integer id, used as the durable table key.
    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for PeerId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for PeerId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
