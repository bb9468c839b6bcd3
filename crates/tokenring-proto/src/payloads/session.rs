//! Session payload types.
//!
//! Every connection opens with a [`Hello`] in each direction so both ends
//! learn the remote identity before any token flows.

use serde::{Deserialize, Serialize};

/// Version carried in [`Hello::version`].
pub const PROTOCOL_VERSION: u8 = 1;

/// Identity exchange, the first frame on every connection.
///
/// `identity` is the peer's stable endpoint identity. Receivers use it to
/// detect self-connections and duplicate endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    /// Protocol version
    pub version: u8,
    /// Stable endpoint identity of the sender
    pub identity: String,
}

impl Hello {
    /// Hello for the current protocol version.
    #[must_use]
    pub fn new(identity: impl Into<String>) -> Self {
        Self { version: PROTOCOL_VERSION, identity: identity.into() }
    }
}
