// Fixed- and variable-length byte strings with a NUL-trim policy

use crate::desc::terminated::TerminatedDesc;
use crate::desc::{Desc, PackCtx, UnpackCtx};
use crate::endian::Endian;
use crate::error::{CodecError, Result};
use crate::value::Value;

/// Byte-string descriptor.
///
/// With a fixed size, pack zero-pads up to the size and unpack takes exactly
/// that many bytes. Without one the string is greedy: unpack consumes all
/// remaining input and returns an empty tail even when `trim` stops the
/// value at an earlier NUL. Use `terminated(b"\0")` when the tail matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrDesc {
    size: Option<usize>,
    trim: bool,
    endian: Option<Endian>,
}

impl StrDesc {
    /// Fixed-size string; trailing NULs are trimmed on unpack.
    pub fn fixed(size: usize) -> StrDesc {
        StrDesc {
            size: Some(size),
            trim: true,
            endian: None,
        }
    }

    /// Greedy string consuming all remaining input.
    pub fn greedy() -> StrDesc {
        StrDesc {
            size: None,
            trim: false,
            endian: None,
        }
    }

    pub fn trim(mut self, trim: bool) -> StrDesc {
        self.trim = trim;
        self
    }

    pub fn size(&self) -> usize {
        self.size.unwrap_or(0)
    }

    pub fn is_fixed(&self) -> bool {
        self.size.is_some()
    }

    pub fn is_trimmed(&self) -> bool {
        self.trim
    }

    pub fn endian(&self) -> Option<Endian> {
        self.endian
    }

    pub(crate) fn set_endian(&mut self, endian: Option<Endian>) {
        self.endian = endian;
    }

    /// Wrap in a Terminated descriptor located at the first occurrence of
    /// `seq`.
    pub fn terminated(self, seq: &[u8]) -> Result<Desc> {
        Ok(Desc::Terminated(TerminatedDesc::literal(
            Desc::Str(self),
            seq,
        )?))
    }

    fn value_bytes<'v>(&self, value: &'v Value) -> Result<&'v [u8]> {
        value.as_bytes().ok_or_else(|| {
            CodecError::Constraint(format!("expected byte string, got {value:?}"))
        })
    }

    pub(crate) fn pack_ctx(&self, value: &Value, _ctx: &PackCtx) -> Result<Vec<u8>> {
        let bytes = self.value_bytes(value)?;
        match self.size {
            Some(size) => {
                if bytes.len() > size {
                    return Err(CodecError::Constraint(format!(
                        "string of {} bytes exceeds fixed size {size}",
                        bytes.len()
                    )));
                }
                let mut out = bytes.to_vec();
                out.resize(size, 0);
                Ok(out)
            }
            None => Ok(bytes.to_vec()),
        }
    }

    pub(crate) fn unpack_ctx<'a>(
        &self,
        buf: &'a [u8],
        _ctx: &UnpackCtx,
    ) -> Result<(Value, &'a [u8])> {
        match self.size {
            Some(size) => {
                if buf.len() < size {
                    return Err(CodecError::MissingBytes {
                        need: size - buf.len(),
                    });
                }
                let mut value = &buf[..size];
                if self.trim {
                    while let [head @ .., 0] = value {
                        value = head;
                    }
                }
                Ok((Value::Bytes(value.to_vec()), &buf[size..]))
            }
            None => {
                let value = if self.trim {
                    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
                    &buf[..end]
                } else {
                    buf
                };
                // greedy: the remainder is empty regardless of NUL position
                Ok((Value::Bytes(value.to_vec()), &buf[buf.len()..]))
            }
        }
    }

    pub(crate) fn default_value(&self) -> Value {
        Value::Bytes(Vec::new())
    }
}
