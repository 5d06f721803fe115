//! Basic-block addresses and concrete execution paths (spec §3).

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Opaque identifier for a basic block. Equality is the only operation
/// the core ever performs on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub u64);

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A finite ordered sequence of [`Address`]es produced by one concrete
/// run of the target binary. Two paths are equal iff they have equal
/// length and equal elements, which falls out of deriving `PartialEq`
/// over the backing `Vec`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path(Vec<Address>);

impl Path {
    pub fn first(&self) -> Option<Address> {
        self.0.first().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Address> + '_ {
        self.0.iter().copied()
    }

    /// All addresses after the first, i.e. the sequence of child steps
    /// taken once the root's address is fixed.
    pub fn tail(&self) -> &[Address] {
        &self.0[1.min(self.0.len())..]
    }

    /// Parses the packed little-endian 8-byte address stream a traced
    /// binary writes to stderr (spec §6). The length must be a multiple
    /// of 8; any other length is a protocol violation the caller turns
    /// into a [`crate::error::FuzzError::TraceLength`].
    pub fn from_packed(bytes: &[u8]) -> Option<Self> {
        if bytes.len() % 8 != 0 {
            return None;
        }
        let mut cursor = Cursor::new(bytes);
        let mut addrs = Vec::with_capacity(bytes.len() / 8);
        while (cursor.position() as usize) < bytes.len() {
            let word = cursor.read_u64::<LittleEndian>().ok()?;
            addrs.push(Address(word));
        }
        Some(Self(addrs))
    }
}

impl From<Vec<Address>> for Path {
    fn from(addrs: Vec<Address>) -> Self {
        Self(addrs)
    }
}

impl std::ops::Index<usize> for Path {
    type Output = Address;
    fn index(&self, i: usize) -> &Address {
        &self.0[i]
    }
}
