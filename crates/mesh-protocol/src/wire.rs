//! Byte-level helpers shared by every codec in the stack.
//!
//! All multi-byte integers are little-endian. 128-bit identifiers are
//! written as the little-endian encoding of their canonical value, which
//! reverses the 16 bytes of the display form.

use bytes::{Buf, BufMut};
use uuid::Uuid;

use crate::error::DecodeError;
use crate::types::NodeId;

/// Encoded size of a 128-bit identifier.
pub const UUID_LEN: usize = 16;

/// Bounds-checked cursor over a borrowed byte slice.
///
/// Every read returns [`DecodeError::Truncated`] instead of panicking when
/// the input runs out. Values are copied out; nothing borrows the input past
/// the call.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn is_empty(&self) -> bool {
        !self.buf.has_remaining()
    }

    fn ensure(&self, needed: usize) -> Result<(), DecodeError> {
        if self.buf.remaining() < needed {
            return Err(DecodeError::Truncated {
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        self.ensure(8)?;
        Ok(self.buf.get_f64_le())
    }

    pub fn read_uuid(&mut self) -> Result<Uuid, DecodeError> {
        self.ensure(UUID_LEN)?;
        Ok(Uuid::from_u128(self.buf.get_u128_le()))
    }

    pub fn read_node_id(&mut self) -> Result<NodeId, DecodeError> {
        self.read_uuid().map(NodeId::from_uuid)
    }

    /// Copy out everything left.
    pub fn read_rest(&mut self) -> Vec<u8> {
        let rest = self.buf.to_vec();
        self.buf.advance(rest.len());
        rest
    }

    /// Fail if any bytes are left over.
    pub fn finish(&self, kind: &'static str, expected: usize) -> Result<(), DecodeError> {
        if self.buf.has_remaining() {
            return Err(DecodeError::InvalidLength {
                kind,
                expected,
                actual: expected + self.buf.remaining(),
            });
        }
        Ok(())
    }
}

pub fn put_uuid(buf: &mut impl BufMut, value: &Uuid) {
    buf.put_u128_le(value.as_u128());
}

pub fn put_node_id(buf: &mut impl BufMut, value: &NodeId) {
    buf.put_u128_le(value.as_u128());
}
