// Explicit zero-byte gaps

use crate::desc::{PackCtx, UnpackCtx};
use crate::error::{CodecError, Result};
use crate::value::Value;

/// `len` bytes of zero; produces no value on unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadDesc {
    len: usize,
}

impl PadDesc {
    pub fn new(len: usize) -> PadDesc {
        PadDesc { len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn pack_ctx(&self, _value: &Value, _ctx: &PackCtx) -> Result<Vec<u8>> {
        Ok(vec![0u8; self.len])
    }

    pub(crate) fn unpack_ctx<'a>(
        &self,
        buf: &'a [u8],
        _ctx: &UnpackCtx,
    ) -> Result<(Value, &'a [u8])> {
        if buf.len() < self.len {
            return Err(CodecError::MissingBytes {
                need: self.len - buf.len(),
            });
        }
        Ok((Value::Null, &buf[self.len..]))
    }
}
