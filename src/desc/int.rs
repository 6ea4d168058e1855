// Integer codecs: signed/unsigned 8/16/32/64-bit with bounds checks

use crate::desc::{PackCtx, UnpackCtx};
use crate::endian::{self, Endian};
use crate::error::{CodecError, Result};
use crate::value::Value;

/// Fixed-width integer descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntDesc {
    width: usize,
    signed: bool,
    endian: Option<Endian>,
}

impl IntDesc {
    /// `width` is the byte count: 1, 2, 4, or 8.
    pub fn new(width: usize, signed: bool) -> Result<IntDesc> {
        if !matches!(width, 1 | 2 | 4 | 8) {
            return Err(CodecError::Build(format!(
                "integer width must be 1, 2, 4, or 8 bytes, got {width}"
            )));
        }
        Ok(IntDesc {
            width,
            signed,
            endian: None,
        })
    }

    pub fn u8() -> IntDesc {
        IntDesc { width: 1, signed: false, endian: None }
    }

    pub fn u16() -> IntDesc {
        IntDesc { width: 2, signed: false, endian: None }
    }

    pub fn u32() -> IntDesc {
        IntDesc { width: 4, signed: false, endian: None }
    }

    pub fn u64() -> IntDesc {
        IntDesc { width: 8, signed: false, endian: None }
    }

    pub fn i8() -> IntDesc {
        IntDesc { width: 1, signed: true, endian: None }
    }

    pub fn i16() -> IntDesc {
        IntDesc { width: 2, signed: true, endian: None }
    }

    pub fn i32() -> IntDesc {
        IntDesc { width: 4, signed: true, endian: None }
    }

    pub fn i64() -> IntDesc {
        IntDesc { width: 8, signed: true, endian: None }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn endian(&self) -> Option<Endian> {
        self.endian
    }

    pub fn with_endian(mut self, endian: Endian) -> IntDesc {
        self.endian = Some(endian);
        self
    }

    pub fn without_endian(mut self) -> IntDesc {
        self.endian = None;
        self
    }

    /// Smallest representable value.
    pub fn min(&self) -> i128 {
        if self.signed {
            -(1i128 << (self.width * 8 - 1))
        } else {
            0
        }
    }

    /// Largest representable value.
    pub fn max(&self) -> i128 {
        if self.signed {
            (1i128 << (self.width * 8 - 1)) - 1
        } else {
            (1i128 << (self.width * 8)) - 1
        }
    }

    pub(crate) fn check_range(&self, v: i128) -> Result<()> {
        if v < self.min() || v > self.max() {
            return Err(CodecError::Constraint(format!(
                "value {v} out of range [{}, {}] for {}-byte {} integer",
                self.min(),
                self.max(),
                self.width,
                if self.signed { "signed" } else { "unsigned" },
            )));
        }
        Ok(())
    }

    fn mask(&self) -> u64 {
        if self.width == 8 {
            u64::MAX
        } else {
            (1u64 << (self.width * 8)) - 1
        }
    }

    /// Unsigned bit pattern of `v` at this width.
    pub(crate) fn raw_bits(&self, v: i128) -> u64 {
        (v as u64) & self.mask()
    }

    /// Emit exactly `width` bytes; out-of-range values are truncated to the
    /// bit pattern (range enforcement happens during validation).
    pub(crate) fn encode(&self, v: i128, endian: Endian) -> Vec<u8> {
        let raw = self.raw_bits(v);
        match endian {
            Endian::Big => raw.to_be_bytes()[8 - self.width..].to_vec(),
            Endian::Little => raw.to_le_bytes()[..self.width].to_vec(),
        }
    }

    /// Decode exactly `width` bytes, sign-extending signed variants.
    pub(crate) fn decode(&self, bytes: &[u8], endian: Endian) -> i128 {
        let mut raw = [0u8; 8];
        match endian {
            Endian::Big => raw[8 - self.width..].copy_from_slice(bytes),
            Endian::Little => raw[..self.width].copy_from_slice(bytes),
        }
        let raw = match endian {
            Endian::Big => u64::from_be_bytes(raw),
            Endian::Little => u64::from_le_bytes(raw),
        };
        self.value_from_bits(raw)
    }

    pub(crate) fn value_from_bits(&self, raw: u64) -> i128 {
        if self.signed {
            let shift = 128 - (self.width as u32 * 8);
            ((raw as i128) << shift) >> shift
        } else {
            raw as i128
        }
    }

    pub(crate) fn pack_ctx(&self, value: &Value, ctx: &PackCtx) -> Result<Vec<u8>> {
        let v = value.as_int().ok_or_else(|| {
            CodecError::Constraint(format!("expected integer, got {value:?}"))
        })?;
        let eff = endian::effective(self.endian, ctx.endian);
        Ok(self.encode(v, eff))
    }

    pub(crate) fn unpack_ctx<'a>(
        &self,
        buf: &'a [u8],
        ctx: &UnpackCtx,
    ) -> Result<(Value, &'a [u8])> {
        if buf.len() < self.width {
            return Err(CodecError::MissingBytes {
                need: self.width - buf.len(),
            });
        }
        let eff = endian::effective(self.endian, ctx.endian);
        let v = self.decode(&buf[..self.width], eff);
        Ok((Value::Int(v), &buf[self.width..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::Desc;

    #[test]
    fn test_u32_both_endians() {
        let le = Desc::from(IntDesc::u32().with_endian(Endian::Little));
        let be = Desc::from(IntDesc::u32().with_endian(Endian::Big));

        let v = Value::from(0xFEEDFACEu32);
        assert_eq!(le.pack(&v).unwrap(), vec![0xCE, 0xFA, 0xED, 0xFE]);
        assert_eq!(be.pack(&v).unwrap(), vec![0xFE, 0xED, 0xFA, 0xCE]);

        assert_eq!(le.unpack(&[0xCE, 0xFA, 0xED, 0xFE]).unwrap(), v);
        assert_eq!(be.unpack(&[0xFE, 0xED, 0xFA, 0xCE]).unwrap(), v);
    }

    #[test]
    fn test_signed_round_trip() {
        let d = Desc::from(IntDesc::i16().with_endian(Endian::Big));
        let bytes = d.pack(&Value::Int(-2)).unwrap();
        assert_eq!(bytes, vec![0xFF, 0xFE]);
        assert_eq!(d.unpack(&bytes).unwrap(), Value::Int(-2));
    }

    #[test]
    fn test_range_limits() {
        for (desc, lo, hi) in [
            (IntDesc::u8(), 0, 255),
            (IntDesc::i8(), -128, 127),
            (IntDesc::u16(), 0, 65535),
            (IntDesc::i16(), -32768, 32767),
        ] {
            assert_eq!(desc.min(), lo);
            assert_eq!(desc.max(), hi);
            let d = Desc::from(desc);
            assert!(d.pack(&Value::Int(lo)).is_ok());
            assert!(d.pack(&Value::Int(hi)).is_ok());
            assert!(matches!(
                d.pack(&Value::Int(hi + 1)),
                Err(CodecError::Constraint(_))
            ));
            assert!(matches!(
                d.pack(&Value::Int(lo - 1)),
                Err(CodecError::Constraint(_))
            ));
        }
    }

    #[test]
    fn test_u64_full_domain() {
        let d = Desc::from(IntDesc::u64().with_endian(Endian::Little));
        let v = Value::Int(u64::MAX as i128);
        let bytes = d.pack(&v).unwrap();
        assert_eq!(bytes, vec![0xFF; 8]);
        assert_eq!(d.unpack(&bytes).unwrap(), v);
    }

    #[test]
    fn test_missing_bytes() {
        let d = Desc::from(IntDesc::u32());
        match d.unpack_one(&[1, 2]) {
            Err(CodecError::MissingBytes { need }) => assert_eq!(need, 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_single_byte_ignores_endian() {
        let v = Value::Int(0x7F);
        let le = Desc::from(IntDesc::u8()).with_endian(Endian::Little);
        let be = Desc::from(IntDesc::u8()).with_endian(Endian::Big);
        assert_eq!(le.pack(&v).unwrap(), be.pack(&v).unwrap());
    }

    #[test]
    fn test_invalid_width() {
        assert!(IntDesc::new(3, false).is_err());
        assert!(IntDesc::new(2, true).is_ok());
    }
}
