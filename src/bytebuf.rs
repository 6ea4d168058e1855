// Owned byte buffer used as a convenience source for read/pread
// Bounds-checked positional access plus a hexdump rendering.

use crate::error::{CodecError, Result};
use std::fmt;
use std::io::Cursor;

/// A byte source with bounds-checked positional access.
///
/// Descriptors consume plain byte slices; this type is the optional
/// convenience wrapper that also hands out an `io::Cursor` for the
/// sequential `read` and positional `pread` engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ByteBuf {
    bytes: Vec<u8>,
}

impl ByteBuf {
    pub fn new(bytes: Vec<u8>) -> ByteBuf {
        ByteBuf { bytes }
    }

    /// A buffer of `size` zero bytes.
    pub fn zeroed(size: usize) -> ByteBuf {
        ByteBuf {
            bytes: vec![0u8; size],
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrow `len` bytes starting at `start`.
    pub fn slice(&self, start: usize, len: usize) -> Result<&[u8]> {
        let end = start
            .checked_add(len)
            .ok_or_else(|| CodecError::Constraint("byte range overflow".into()))?;
        if end > self.bytes.len() {
            return Err(CodecError::MissingBytes {
                need: end - self.bytes.len(),
            });
        }
        Ok(&self.bytes[start..end])
    }

    /// Overwrite bytes starting at `pos`.
    pub fn write_at(&mut self, pos: usize, data: &[u8]) -> Result<()> {
        let end = pos
            .checked_add(data.len())
            .ok_or_else(|| CodecError::Constraint("byte range overflow".into()))?;
        if end > self.bytes.len() {
            return Err(CodecError::MissingBytes {
                need: end - self.bytes.len(),
            });
        }
        self.bytes[pos..end].copy_from_slice(data);
        Ok(())
    }

    pub fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }

    pub fn extend_zeroed(&mut self, total: usize) {
        if total > self.bytes.len() {
            self.bytes.resize(total, 0);
        }
    }

    /// A cursor over the bytes, implementing `Read + Seek` for the
    /// engine's `read`/`pread` operations.
    pub fn cursor(&self) -> Cursor<&[u8]> {
        Cursor::new(&self.bytes)
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }

    /// Hexdump rendering of a byte range, `hexdump -C` style.
    pub fn printable(&self, start: usize, end: Option<usize>) -> String {
        let end = end.unwrap_or(self.bytes.len()).min(self.bytes.len());
        let start = start.min(end);
        hexdump(&self.bytes[start..end])
    }
}

impl AsRef<[u8]> for ByteBuf {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for ByteBuf {
    fn from(bytes: Vec<u8>) -> ByteBuf {
        ByteBuf::new(bytes)
    }
}

impl From<&[u8]> for ByteBuf {
    fn from(bytes: &[u8]) -> ByteBuf {
        ByteBuf::new(bytes.to_vec())
    }
}

impl fmt::Display for ByteBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ByteBuf({} bytes)", self.bytes.len())
    }
}

fn hexdump(data: &[u8]) -> String {
    let mut out = String::new();

    for (i, chunk) in data.chunks(16).enumerate() {
        out.push_str(&format!("{:08x}  ", i * 16));

        for j in 0..16 {
            if j == 8 {
                out.push(' ');
            }
            match chunk.get(j) {
                Some(byte) => out.push_str(&format!("{byte:02x} ")),
                None => out.push_str("   "),
            }
        }

        out.push_str(" |");
        for byte in chunk {
            if (0x20..=0x7e).contains(byte) {
                out.push(*byte as char);
            } else {
                out.push('.');
            }
        }
        out.push_str("|\n");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_and_write() {
        let mut buf = ByteBuf::zeroed(8);
        buf.write_at(2, &[0xAA, 0xBB]).unwrap();
        assert_eq!(buf.slice(2, 2).unwrap(), &[0xAA, 0xBB]);
        assert_eq!(buf.slice(0, 2).unwrap(), &[0, 0]);
    }

    #[test]
    fn test_bounds() {
        let buf = ByteBuf::new(vec![1, 2, 3]);
        match buf.slice(2, 5) {
            Err(CodecError::MissingBytes { need }) => assert_eq!(need, 4),
            other => panic!("unexpected: {other:?}"),
        }
        let mut buf = buf;
        assert!(buf.write_at(3, &[9]).is_err());
    }

    #[test]
    fn test_extend_truncate() {
        let mut buf = ByteBuf::new(vec![1, 2]);
        buf.extend_zeroed(4);
        assert_eq!(buf.as_ref(), &[1, 2, 0, 0]);
        buf.truncate(1);
        assert_eq!(buf.as_ref(), &[1]);
    }

    #[test]
    fn test_printable() {
        let buf = ByteBuf::new(vec![0x41, 0x42, 0x00, 0x7f]);
        let dump = buf.printable(0, None);
        assert!(dump.contains("41 42 00 7f"));
        assert!(dump.contains("|AB..|"));
    }
}
