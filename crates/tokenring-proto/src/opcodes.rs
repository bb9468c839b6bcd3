//! Operation codes for token ring frames.
//!
//! # Opcode Ranges
//!
//! - `0x0000-0x00FF`: Session (identity exchange)
//! - `0x0100-0x01FF`: Circulation (ring tokens)

/// Frame operation codes
///
/// Serialized as Big Endian `u16` in the frame header. Unknown values must be
/// rejected with [`ProtocolError::InvalidOpcode`](crate::ProtocolError), never
/// silently skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    /// Identity exchange, first frame on every connection
    Hello = 0x0001,

    /// Circulating ring token (counter 0 is the synchronization marker)
    Token = 0x0100,
}

impl Opcode {
    /// Convert to raw u16 value
    #[must_use]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Convert from raw u16 value. `None` for unknown opcodes.
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::Hello),
            0x0100 => Some(Self::Token),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_opcodes_map_back() {
        for opcode in [Opcode::Hello, Opcode::Token] {
            assert_eq!(Opcode::from_u16(opcode.to_u16()), Some(opcode));
        }
    }

    #[test]
    fn unknown_opcodes_are_none() {
        assert_eq!(Opcode::from_u16(0x0000), None);
        assert_eq!(Opcode::from_u16(0x0002), None);
        assert_eq!(Opcode::from_u16(0xFFFF), None);
    }
}
