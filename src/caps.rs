//! Queue access rights as bitmask constants

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::constants::{composite_names, rights_to_names};

/// Queue access rights. Values are fixed by the queueing platform's ABI.
#[allow(non_snake_case)]
pub mod QueueRight {
    // Message rights
    pub const DELETE_MESSAGE: u32 = 0x0000_0001;
    pub const PEEK_MESSAGE: u32 = 0x0000_0002;
    pub const WRITE_MESSAGE: u32 = 0x0000_0004;
    pub const DELETE_JOURNAL_MESSAGE: u32 = 0x0000_0008;

    // Queue property rights
    pub const SET_QUEUE_PROPERTIES: u32 = 0x0000_0010;
    pub const GET_QUEUE_PROPERTIES: u32 = 0x0000_0020;

    // Standard rights
    pub const DELETE_QUEUE: u32 = 0x0001_0000;
    pub const GET_QUEUE_PERMISSIONS: u32 = 0x0002_0000;
    pub const CHANGE_QUEUE_PERMISSIONS: u32 = 0x0004_0000;
    pub const TAKE_QUEUE_OWNERSHIP: u32 = 0x0008_0000;

    // Composites
    pub const RECEIVE_MESSAGE: u32 = DELETE_MESSAGE | PEEK_MESSAGE;
    pub const RECEIVE_JOURNAL_MESSAGE: u32 = DELETE_JOURNAL_MESSAGE | PEEK_MESSAGE;
    pub const GENERIC_READ: u32 =
        GET_QUEUE_PROPERTIES | GET_QUEUE_PERMISSIONS | RECEIVE_MESSAGE | RECEIVE_JOURNAL_MESSAGE;
    pub const GENERIC_WRITE: u32 = GET_QUEUE_PROPERTIES | GET_QUEUE_PERMISSIONS | WRITE_MESSAGE;
    pub const GENERIC_ALL: u32 = RECEIVE_MESSAGE
        | RECEIVE_JOURNAL_MESSAGE
        | WRITE_MESSAGE
        | SET_QUEUE_PROPERTIES
        | GET_QUEUE_PROPERTIES
        | DELETE_QUEUE
        | GET_QUEUE_PERMISSIONS
        | CHANGE_QUEUE_PERMISSIONS
        | TAKE_QUEUE_OWNERSHIP;
}

/// 32-bit access mask as stored in an ACE.
///
/// Bits outside [`QueueRight::GENERIC_ALL`] are preserved as-is; the mask is
/// never normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessMask(u32);

impl AccessMask {
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if every bit of `required` is set
    #[inline]
    pub const fn contains(self, required: u32) -> bool {
        (self.0 & required) == required
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Single-bit right names set in this mask
    pub fn names(self) -> Vec<&'static str> {
        rights_to_names(self.0)
    }

    /// Composite right names fully granted by this mask
    pub fn composites(self) -> Vec<&'static str> {
        composite_names(self.0)
    }
}

impl From<u32> for AccessMask {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl From<AccessMask> for u32 {
    fn from(mask: AccessMask) -> Self {
        mask.0
    }
}

impl BitOr for AccessMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for AccessMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for AccessMask {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for AccessMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.names();
        if names.is_empty() {
            write!(f, "0x{:08X}", self.0)
        } else {
            write!(f, "0x{:08X} ({})", self.0, names.join(" | "))
        }
    }
}
