// Descriptor family and the shared pack/unpack engine
// A closed, tagged set of layout descriptors with one operation surface;
// endian threads down the tree per call.

pub mod array;
pub mod bitfield;
pub mod bitmap;
pub mod enums;
pub mod int;
pub mod pad;
pub mod string;
pub mod structs;
pub mod terminated;
pub mod unions;

pub use array::ArrayDesc;
pub use bitfield::{BitSlot, BitfieldBuilder, BitfieldDesc};
pub use bitmap::{BitmapBuilder, BitmapDesc};
pub use enums::{EnumBuilder, EnumDesc};
pub use int::IntDesc;
pub use pad::PadDesc;
pub use string::StrDesc;
pub use structs::{Slot, StructBuilder, StructDesc, StructSizeFn};
pub use terminated::{LocateFn, TerminateFn, TerminatedDesc};
pub use unions::{Member, UnionBuilder, UnionDesc, UnionSizeFn, UnionValue};

use crate::endian::Endian;
use crate::error::{CodecError, Result};
use crate::schema;
use crate::value::Value;
use std::io::{Read, Seek, SeekFrom};
use tracing::debug;

/// Per-call pack options.
#[derive(Debug, Clone, Copy)]
pub struct PackOpts<'a> {
    endian: Option<Endian>,
    validate: bool,
    pad_bytes: Option<&'a [u8]>,
}

impl Default for PackOpts<'_> {
    fn default() -> Self {
        PackOpts::new()
    }
}

impl<'a> PackOpts<'a> {
    pub fn new() -> PackOpts<'a> {
        PackOpts {
            endian: None,
            validate: true,
            pad_bytes: None,
        }
    }

    /// Caller-supplied endian, overridden by any fixed descriptor endian.
    pub fn endian(mut self, endian: Endian) -> PackOpts<'a> {
        self.endian = Some(endian);
        self
    }

    /// Skip schema validation (nested packs always do).
    pub fn validate(mut self, validate: bool) -> PackOpts<'a> {
        self.validate = validate;
        self
    }

    /// Fill bytes for dynamic-size unions extending their buffer.
    pub fn pad_bytes(mut self, pad: &'a [u8]) -> PackOpts<'a> {
        self.pad_bytes = Some(pad);
        self
    }
}

/// Engine-internal pack state threaded down the descriptor tree.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PackCtx<'a> {
    pub endian: Option<Endian>,
    pub pad_bytes: Option<&'a [u8]>,
}

/// Engine-internal unpack state.
#[derive(Debug, Clone, Copy)]
pub(crate) struct UnpackCtx {
    pub endian: Option<Endian>,
}

/// A type descriptor: how to encode and decode one C-style type.
#[derive(Debug, Clone, PartialEq)]
pub enum Desc {
    Int(IntDesc),
    Enum(EnumDesc),
    Bitmap(BitmapDesc),
    Bitfield(BitfieldDesc),
    Str(StrDesc),
    Array(ArrayDesc),
    Terminated(TerminatedDesc),
    Pad(PadDesc),
    Struct(StructDesc),
    Union(UnionDesc),
}

impl Desc {
    /// Pack with validation on and default endian resolution.
    pub fn pack(&self, value: &Value) -> Result<Vec<u8>> {
        self.pack_with(value, PackOpts::new())
    }

    pub fn pack_with(&self, value: &Value, opts: PackOpts) -> Result<Vec<u8>> {
        debug!(desc = ?self.kind_name(), validate = opts.validate, "pack");
        let normalized;
        let value = if opts.validate {
            normalized = schema::validate(self, value)?;
            &normalized
        } else {
            value
        };
        let ctx = PackCtx {
            endian: opts.endian,
            pad_bytes: opts.pad_bytes,
        };
        self.pack_ctx(value, &ctx)
    }

    /// Unpack one value; returns it together with the unconsumed tail.
    pub fn unpack_one<'a>(&self, buf: &'a [u8]) -> Result<(Value, &'a [u8])> {
        self.unpack_one_with(buf, None)
    }

    pub fn unpack_one_with<'a>(
        &self,
        buf: &'a [u8],
        endian: Option<Endian>,
    ) -> Result<(Value, &'a [u8])> {
        self.unpack_one_ctx(buf, &UnpackCtx { endian })
    }

    /// Unpack one value, discarding the tail.
    pub fn unpack(&self, buf: &[u8]) -> Result<Value> {
        Ok(self.unpack_one(buf)?.0)
    }

    pub fn unpack_with(&self, buf: &[u8], endian: Option<Endian>) -> Result<Value> {
        Ok(self.unpack_one_with(buf, endian)?.0)
    }

    /// Unpack values until the input is exhausted; trailing partial bytes
    /// surface the inner decoder's error.
    pub fn unpack_all(&self, buf: &[u8]) -> Result<Vec<Value>> {
        self.unpack_all_with(buf, None)
    }

    pub fn unpack_all_with(&self, buf: &[u8], endian: Option<Endian>) -> Result<Vec<Value>> {
        let ctx = UnpackCtx { endian };
        let mut out = Vec::new();
        let mut rest = buf;
        while !rest.is_empty() {
            let (v, r) = self.unpack_one_ctx(rest, &ctx)?;
            out.push(v);
            rest = r;
        }
        Ok(out)
    }

    /// Read exactly `size` bytes from a sequential source and unpack them.
    /// Fixed-size descriptors only.
    pub fn read<R: Read>(&self, io: &mut R) -> Result<Value> {
        self.read_with(io, None)
    }

    pub fn read_with<R: Read>(&self, io: &mut R, endian: Option<Endian>) -> Result<Value> {
        if !self.is_fixed_size() {
            return Err(CodecError::Unsupported(
                "read on a variable-size descriptor".into(),
            ));
        }
        let mut buf = vec![0u8; self.size()];
        io.read_exact(&mut buf)?;
        self.unpack_with(&buf, endian)
    }

    /// Positional read: seek to `offset`, then read and unpack.
    /// Fixed-size descriptors only.
    pub fn pread<R: Read + Seek>(&self, io: &mut R, offset: u64) -> Result<Value> {
        self.pread_with(io, offset, None)
    }

    pub fn pread_with<R: Read + Seek>(
        &self,
        io: &mut R,
        offset: u64,
        endian: Option<Endian>,
    ) -> Result<Value> {
        if !self.is_fixed_size() {
            return Err(CodecError::Unsupported(
                "pread on a variable-size descriptor".into(),
            ));
        }
        io.seek(SeekFrom::Start(offset))?;
        self.read_with(io, endian)
    }

    /// Exact byte count for fixed-size descriptors; the minimum otherwise.
    pub fn size(&self) -> usize {
        match self {
            Desc::Int(d) => d.width(),
            Desc::Enum(d) => d.size(),
            Desc::Bitmap(d) => d.size(),
            Desc::Bitfield(d) => d.size(),
            Desc::Str(d) => d.size(),
            Desc::Array(d) => d.min_size(),
            Desc::Terminated(d) => d.min_size(),
            Desc::Pad(d) => d.len(),
            Desc::Struct(d) => d.min_size(),
            Desc::Union(d) => d.min_size(),
        }
    }

    /// True iff the byte count is known a priori.
    pub fn is_fixed_size(&self) -> bool {
        match self {
            Desc::Int(_) | Desc::Enum(_) | Desc::Bitmap(_) | Desc::Bitfield(_) | Desc::Pad(_) => {
                true
            }
            Desc::Str(d) => d.is_fixed(),
            Desc::Array(d) => d.is_fixed_size(),
            Desc::Terminated(_) => false,
            Desc::Struct(d) => d.is_fixed_size(),
            Desc::Union(d) => d.is_fixed_size(),
        }
    }

    /// True iff unpack consumes all remaining input.
    pub fn is_greedy(&self) -> bool {
        match self {
            Desc::Str(d) => !d.is_fixed(),
            Desc::Array(d) => d.is_greedy(),
            Desc::Struct(d) => d.is_greedy(),
            Desc::Union(d) => d.is_greedy(),
            _ => false,
        }
    }

    /// The value packed for a missing field.
    pub fn default_value(&self) -> Value {
        match self {
            Desc::Int(_) => Value::Int(0),
            Desc::Enum(d) => d.default_value(),
            Desc::Bitmap(d) => d.default_value(),
            Desc::Bitfield(d) => d.default_value(),
            Desc::Str(d) => d.default_value(),
            Desc::Array(d) => d.default_value(),
            Desc::Terminated(d) => d.inner().default_value(),
            Desc::Pad(_) => Value::Null,
            Desc::Struct(d) => d.default_value(),
            Desc::Union(d) => d.default_value(),
        }
    }

    /// This descriptor's own fixed endian, if set.
    pub fn endian(&self) -> Option<Endian> {
        match self {
            Desc::Int(d) => d.endian(),
            Desc::Enum(d) => d.endian(),
            Desc::Bitmap(d) => d.endian(),
            Desc::Bitfield(d) => d.endian(),
            Desc::Str(d) => d.endian(),
            Desc::Array(d) => d.endian(),
            Desc::Terminated(d) => d.endian(),
            Desc::Pad(_) => None,
            Desc::Struct(d) => d.endian(),
            Desc::Union(d) => d.endian(),
        }
    }

    /// A clone carrying `endian` as its fixed byte order; children with
    /// their own fixed endian keep it. Idempotent.
    pub fn with_endian(&self, endian: Endian) -> Desc {
        if self.endian() == Some(endian) {
            return self.clone();
        }
        let mut out = self.clone();
        out.set_endian(Some(endian));
        out
    }

    /// Remove this descriptor's own endian override (one level only).
    pub fn without_endian(&self) -> Desc {
        let mut out = self.clone();
        out.set_endian(None);
        out
    }

    fn set_endian(&mut self, endian: Option<Endian>) {
        match self {
            Desc::Int(d) => {
                *d = match endian {
                    Some(e) => d.with_endian(e),
                    None => d.without_endian(),
                }
            }
            Desc::Enum(d) => d.set_endian(endian),
            Desc::Bitmap(d) => d.set_endian(endian),
            Desc::Bitfield(d) => d.set_endian(endian),
            Desc::Str(d) => d.set_endian(endian),
            Desc::Array(d) => d.set_endian(endian),
            Desc::Terminated(d) => d.set_endian(endian),
            Desc::Pad(_) => {}
            Desc::Struct(d) => d.set_endian(endian),
            Desc::Union(d) => d.set_endian(endian),
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Desc::Int(_) => "int",
            Desc::Enum(_) => "enum",
            Desc::Bitmap(_) => "bitmap",
            Desc::Bitfield(_) => "bitfield",
            Desc::Str(_) => "string",
            Desc::Array(_) => "array",
            Desc::Terminated(_) => "terminated",
            Desc::Pad(_) => "pad",
            Desc::Struct(_) => "struct",
            Desc::Union(_) => "union",
        }
    }

    pub(crate) fn pack_ctx(&self, value: &Value, ctx: &PackCtx) -> Result<Vec<u8>> {
        match self {
            Desc::Int(d) => d.pack_ctx(value, ctx),
            Desc::Enum(d) => d.pack_ctx(value, ctx),
            Desc::Bitmap(d) => d.pack_ctx(value, ctx),
            Desc::Bitfield(d) => d.pack_ctx(value, ctx),
            Desc::Str(d) => d.pack_ctx(value, ctx),
            Desc::Array(d) => d.pack_ctx(value, ctx),
            Desc::Terminated(d) => d.pack_ctx(value, ctx),
            Desc::Pad(d) => d.pack_ctx(value, ctx),
            Desc::Struct(d) => d.pack_ctx(value, ctx),
            Desc::Union(d) => d.pack_ctx(value, ctx),
        }
    }

    pub(crate) fn unpack_one_ctx<'a>(
        &self,
        buf: &'a [u8],
        ctx: &UnpackCtx,
    ) -> Result<(Value, &'a [u8])> {
        match self {
            Desc::Int(d) => d.unpack_ctx(buf, ctx),
            Desc::Enum(d) => d.unpack_ctx(buf, ctx),
            Desc::Bitmap(d) => d.unpack_ctx(buf, ctx),
            Desc::Bitfield(d) => d.unpack_ctx(buf, ctx),
            Desc::Str(d) => d.unpack_ctx(buf, ctx),
            Desc::Array(d) => d.unpack_ctx(buf, ctx),
            Desc::Terminated(d) => d.unpack_ctx(buf, ctx),
            Desc::Pad(d) => d.unpack_ctx(buf, ctx),
            Desc::Struct(d) => d.unpack_ctx(buf, ctx),
            Desc::Union(d) => d.unpack_ctx(buf, ctx),
        }
    }
}

impl From<IntDesc> for Desc {
    fn from(d: IntDesc) -> Desc {
        Desc::Int(d)
    }
}

impl From<EnumDesc> for Desc {
    fn from(d: EnumDesc) -> Desc {
        Desc::Enum(d)
    }
}

impl From<BitmapDesc> for Desc {
    fn from(d: BitmapDesc) -> Desc {
        Desc::Bitmap(d)
    }
}

impl From<BitfieldDesc> for Desc {
    fn from(d: BitfieldDesc) -> Desc {
        Desc::Bitfield(d)
    }
}

impl From<StrDesc> for Desc {
    fn from(d: StrDesc) -> Desc {
        Desc::Str(d)
    }
}

impl From<ArrayDesc> for Desc {
    fn from(d: ArrayDesc) -> Desc {
        Desc::Array(d)
    }
}

impl From<TerminatedDesc> for Desc {
    fn from(d: TerminatedDesc) -> Desc {
        Desc::Terminated(d)
    }
}

impl From<PadDesc> for Desc {
    fn from(d: PadDesc) -> Desc {
        Desc::Pad(d)
    }
}

impl From<StructDesc> for Desc {
    fn from(d: StructDesc) -> Desc {
        Desc::Struct(d)
    }
}

impl From<UnionDesc> for Desc {
    fn from(d: UnionDesc) -> Desc {
        Desc::Union(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytebuf::ByteBuf;

    #[test]
    fn test_with_endian_idempotent() {
        let d = Desc::from(IntDesc::u32());
        let be = d.with_endian(Endian::Big);
        assert_eq!(be.with_endian(Endian::Big), be);
        assert_eq!(
            d.with_endian(Endian::Little).with_endian(Endian::Big),
            d.with_endian(Endian::Big)
        );
        assert_eq!(be.without_endian(), d);
    }

    #[test]
    fn test_with_endian_matches_caller_endian() {
        let d = Desc::from(IntDesc::u16());
        let v = Value::Int(0x0102);
        assert_eq!(
            d.with_endian(Endian::Big).pack(&v).unwrap(),
            d.pack_with(&v, PackOpts::new().endian(Endian::Big)).unwrap()
        );
    }

    #[test]
    fn test_inner_fixed_endian_wins() {
        let le_field = Desc::from(IntDesc::u16().with_endian(Endian::Little));
        let d = Desc::from(
            StructDesc::builder()
                .field("a", le_field)
                .field("b", Desc::from(IntDesc::u16()))
                .build()
                .unwrap(),
        )
        .with_endian(Endian::Big);

        let v: crate::value::ValueMap = [
            ("a", Value::Int(0x0102)),
            ("b", Value::Int(0x0304)),
        ]
        .into_iter()
        .collect();
        // "a" keeps little-endian, "b" inherits big
        assert_eq!(
            d.pack(&Value::Map(v)).unwrap(),
            vec![0x02, 0x01, 0x03, 0x04]
        );
    }

    #[test]
    fn test_unpack_all() {
        let d = Desc::from(IntDesc::u16()).with_endian(Endian::Big);
        let vs = d.unpack_all(&[0, 1, 0, 2, 0, 3]).unwrap();
        assert_eq!(
            vs,
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
        assert!(matches!(
            d.unpack_all(&[0, 1, 0]),
            Err(CodecError::MissingBytes { need: 1 })
        ));
        assert!(d.unpack_all(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_read_and_pread() {
        let d = Desc::from(IntDesc::u16()).with_endian(Endian::Big);
        let buf = ByteBuf::new(vec![0xAA, 0x01, 0x02, 0x03, 0x04]);

        let mut cur = buf.cursor();
        assert_eq!(d.pread(&mut cur, 1).unwrap(), Value::Int(0x0102));
        assert_eq!(d.read(&mut cur).unwrap(), Value::Int(0x0304));

        let greedy = Desc::from(StrDesc::greedy());
        let mut cur = buf.cursor();
        assert!(matches!(
            greedy.read(&mut cur),
            Err(CodecError::Unsupported(_))
        ));
        assert!(matches!(
            greedy.pread(&mut cur, 0),
            Err(CodecError::Unsupported(_))
        ));
    }

    #[test]
    fn test_read_short_source() {
        let d = Desc::from(IntDesc::u32());
        let buf = ByteBuf::new(vec![1, 2]);
        assert!(matches!(
            d.read(&mut buf.cursor()),
            Err(CodecError::Io(_))
        ));
    }

    #[test]
    fn test_pack_unpack_round_trip_fixed_kinds() {
        let kinds: Vec<(Desc, Value)> = vec![
            (Desc::from(IntDesc::i32()), Value::Int(-123456)),
            (Desc::from(StrDesc::fixed(4)), Value::from("ab")),
            (
                Desc::from(ArrayDesc::fixed(Desc::from(IntDesc::u8()), 3).unwrap()),
                Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
            ),
        ];
        for (d, v) in kinds {
            let bytes = d.pack(&v).unwrap();
            assert_eq!(bytes.len(), d.size());
            assert_eq!(d.unpack(&bytes).unwrap(), v, "round trip for {d:?}");
        }
    }

    #[test]
    fn test_repack_prefix_law() {
        let d = Desc::from(StrDesc::fixed(4));
        let input = [b'h', b'i', 0, 0, 0xEE];
        let (v, _) = d.unpack_one(&input).unwrap();
        let repacked = d.pack(&v).unwrap();
        assert!(input.starts_with(&repacked[..]));
    }
}
