// Fixed-width integers carrying sub-integer fields at bit offsets

use crate::desc::int::IntDesc;
use crate::desc::{PackCtx, UnpackCtx};
use crate::endian::Endian;
use crate::error::{CodecError, Result};
use crate::value::{Value, ValueMap};
use std::sync::Arc;

/// One sub-field: `bits` wide at `offset` counted from the LSB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitSlot {
    pub name: String,
    pub offset: u32,
    pub bits: u32,
    pub signed: bool,
}

impl BitSlot {
    fn mask(&self) -> u64 {
        if self.bits >= 64 {
            u64::MAX
        } else {
            (1u64 << self.bits) - 1
        }
    }

    pub(crate) fn min(&self) -> i128 {
        if self.signed {
            -(1i128 << (self.bits - 1))
        } else {
            0
        }
    }

    pub(crate) fn max(&self) -> i128 {
        if self.signed {
            (1i128 << (self.bits - 1)) - 1
        } else {
            (1i128 << self.bits) - 1
        }
    }
}

/// Bitfield descriptor: several sub-integer fields over one carrier integer.
#[derive(Debug, Clone, PartialEq)]
pub struct BitfieldDesc {
    int: IntDesc,
    slots: Arc<Vec<BitSlot>>,
    endian: Option<Endian>,
}

impl BitfieldDesc {
    pub fn builder() -> BitfieldBuilder {
        BitfieldBuilder::new()
    }

    pub fn size(&self) -> usize {
        self.int.width()
    }

    pub fn endian(&self) -> Option<Endian> {
        self.endian
    }

    pub(crate) fn set_endian(&mut self, endian: Option<Endian>) {
        self.endian = endian;
    }

    pub fn slots(&self) -> &[BitSlot] {
        &self.slots
    }

    pub fn slot(&self, name: &str) -> Option<&BitSlot> {
        self.slots.iter().find(|s| s.name == name)
    }

    pub(crate) fn pack_ctx(&self, value: &Value, ctx: &PackCtx) -> Result<Vec<u8>> {
        let map = value.as_map().ok_or_else(|| {
            CodecError::Constraint(format!("expected field map, got {value:?}"))
        })?;
        let mut acc: u64 = 0;
        for slot in self.slots.iter() {
            let v = map.get_int(&slot.name).unwrap_or(0);
            acc |= ((v as u64) & slot.mask()) << slot.offset;
        }
        let child = PackCtx {
            endian: self.endian.or(ctx.endian),
            ..*ctx
        };
        self.int.pack_ctx(&Value::Int(acc as i128), &child)
    }

    pub(crate) fn unpack_ctx<'a>(
        &self,
        buf: &'a [u8],
        ctx: &UnpackCtx,
    ) -> Result<(Value, &'a [u8])> {
        let child = UnpackCtx {
            endian: self.endian.or(ctx.endian),
        };
        let (v, rest) = self.int.unpack_ctx(buf, &child)?;
        let raw = self.int.raw_bits(v.as_int().unwrap_or(0));
        let mut map = ValueMap::new();
        for slot in self.slots.iter() {
            let bits = (raw >> slot.offset) & slot.mask();
            let value = if slot.signed {
                let shift = 128 - slot.bits;
                ((bits as i128) << shift) >> shift
            } else {
                bits as i128
            };
            map.insert(slot.name.clone(), Value::Int(value));
        }
        Ok((Value::Map(map), rest))
    }

    pub(crate) fn default_value(&self) -> Value {
        let mut map = ValueMap::new();
        for slot in self.slots.iter() {
            map.insert(slot.name.clone(), Value::Int(0));
        }
        Value::Map(map)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuilderMode {
    Unset,
    Declarative,
    Programmatic,
}

/// Builder for bitfields.
///
/// Declarative style allocates fields upward from bit 0
/// (`unsigned`/`signed`/`skip`/`align`); programmatic style pins each field
/// with `field`/`field_signed`. The two styles cannot be mixed.
#[derive(Debug)]
pub struct BitfieldBuilder {
    slots: Vec<BitSlot>,
    cursor: u32,
    width: Option<usize>,
    mode: BuilderMode,
    mixed: bool,
}

impl Default for BitfieldBuilder {
    fn default() -> BitfieldBuilder {
        BitfieldBuilder::new()
    }
}

impl BitfieldBuilder {
    pub fn new() -> BitfieldBuilder {
        BitfieldBuilder {
            slots: Vec::new(),
            cursor: 0,
            width: None,
            mode: BuilderMode::Unset,
            mixed: false,
        }
    }

    fn enter(&mut self, mode: BuilderMode) {
        match self.mode {
            BuilderMode::Unset => self.mode = mode,
            m if m != mode => self.mixed = true,
            _ => {}
        }
    }

    /// Declarative: unsigned field at the current bit cursor.
    pub fn unsigned(mut self, name: impl Into<String>, bits: u32) -> BitfieldBuilder {
        self.enter(BuilderMode::Declarative);
        self.slots.push(BitSlot {
            name: name.into(),
            offset: self.cursor,
            bits,
            signed: false,
        });
        self.cursor += bits;
        self
    }

    /// Declarative: signed field at the current bit cursor.
    pub fn signed(mut self, name: impl Into<String>, bits: u32) -> BitfieldBuilder {
        self.enter(BuilderMode::Declarative);
        self.slots.push(BitSlot {
            name: name.into(),
            offset: self.cursor,
            bits,
            signed: true,
        });
        self.cursor += bits;
        self
    }

    /// Declarative: leave `bits` unnamed bits at the cursor.
    pub fn skip(mut self, bits: u32) -> BitfieldBuilder {
        self.enter(BuilderMode::Declarative);
        self.cursor += bits;
        self
    }

    /// Declarative: advance the cursor to the next multiple of `bits`.
    pub fn align(mut self, bits: u32) -> BitfieldBuilder {
        self.enter(BuilderMode::Declarative);
        if bits > 0 {
            self.cursor = (self.cursor + bits - 1) / bits * bits;
        }
        self
    }

    /// Programmatic: unsigned field at an explicit offset.
    pub fn field(mut self, name: impl Into<String>, offset: u32, bits: u32) -> BitfieldBuilder {
        self.enter(BuilderMode::Programmatic);
        self.slots.push(BitSlot {
            name: name.into(),
            offset,
            bits,
            signed: false,
        });
        self
    }

    /// Programmatic: signed field at an explicit offset.
    pub fn field_signed(
        mut self,
        name: impl Into<String>,
        offset: u32,
        bits: u32,
    ) -> BitfieldBuilder {
        self.enter(BuilderMode::Programmatic);
        self.slots.push(BitSlot {
            name: name.into(),
            offset,
            bits,
            signed: true,
        });
        self
    }

    /// Explicit carrier width in bytes (1, 2, 4, or 8); otherwise the
    /// smallest power-of-two width covering every span is chosen.
    pub fn width(mut self, bytes: usize) -> BitfieldBuilder {
        self.width = Some(bytes);
        self
    }

    pub fn build(self) -> Result<BitfieldDesc> {
        if self.mixed {
            return Err(CodecError::Build(
                "declarative and programmatic bitfield styles cannot be mixed".into(),
            ));
        }
        if self.slots.is_empty() {
            return Err(CodecError::Build("bitfield requires at least one field".into()));
        }

        let mut span: u32 = 0;
        let mut used: u128 = 0;
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.bits == 0 || slot.bits > 64 {
                return Err(CodecError::Build(format!(
                    "field {} has invalid width {}",
                    slot.name, slot.bits
                )));
            }
            if self.slots[..i].iter().any(|s| s.name == slot.name) {
                return Err(CodecError::Build(format!(
                    "duplicate bitfield name: {}",
                    slot.name
                )));
            }
            let end = slot.offset + slot.bits;
            if end > 64 {
                return Err(CodecError::Build(format!(
                    "field {} spans past bit 64",
                    slot.name
                )));
            }
            let mask = (((1u128 << slot.bits) - 1) << slot.offset) as u128;
            if used & mask != 0 {
                return Err(CodecError::Build(format!(
                    "field {} overlaps an earlier field",
                    slot.name
                )));
            }
            used |= mask;
            span = span.max(end);
        }

        let auto_width = match (span + 7) / 8 {
            0 | 1 => 1,
            2 => 2,
            3 | 4 => 4,
            _ => 8,
        };
        let width = match self.width {
            Some(w) => {
                if !matches!(w, 1 | 2 | 4 | 8) {
                    return Err(CodecError::Build(format!(
                        "bitfield width must be 1, 2, 4, or 8 bytes, got {w}"
                    )));
                }
                if (w * 8) < span as usize {
                    return Err(CodecError::Build(format!(
                        "declared width {w} bytes cannot hold a {span}-bit span"
                    )));
                }
                w
            }
            None => auto_width,
        };

        Ok(BitfieldDesc {
            int: IntDesc::new(width, false)?,
            slots: Arc::new(self.slots),
            endian: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::Desc;

    #[test]
    fn test_declarative_layout() {
        // {a:1, b:2, c:3} allocated upward from the LSB
        let d = Desc::from(
            BitfieldDesc::builder()
                .unsigned("a", 1)
                .unsigned("b", 2)
                .unsigned("c", 3)
                .build()
                .unwrap(),
        );
        assert_eq!(d.size(), 1);

        let v: ValueMap = [("c", Value::Int(7))].into_iter().collect();
        assert_eq!(d.pack(&Value::Map(v)).unwrap(), vec![0x38]);

        let m: ValueMap = [
            ("a", Value::Int(0)),
            ("b", Value::Int(0)),
            ("c", Value::Int(7)),
        ]
        .into_iter()
        .collect();
        assert_eq!(d.unpack(&[0x38]).unwrap(), Value::Map(m));
    }

    #[test]
    fn test_programmatic_layout() {
        let d = Desc::from(
            BitfieldDesc::builder()
                .field("lo", 0, 4)
                .field("hi", 12, 4)
                .build()
                .unwrap(),
        )
        .with_endian(Endian::Big);
        assert_eq!(d.size(), 2);

        let v: ValueMap = [("lo", Value::Int(0xA)), ("hi", Value::Int(0x5))]
            .into_iter()
            .collect();
        assert_eq!(d.pack(&Value::Map(v)).unwrap(), vec![0x50, 0x0A]);
    }

    #[test]
    fn test_signed_extraction() {
        let d = Desc::from(
            BitfieldDesc::builder()
                .signed("x", 4)
                .unsigned("y", 4)
                .build()
                .unwrap(),
        );
        let v = d.unpack(&[0x2F]).unwrap();
        let m = v.as_map().unwrap();
        assert_eq!(m.get_int("x"), Some(-1));
        assert_eq!(m.get_int("y"), Some(2));
    }

    #[test]
    fn test_skip_and_align() {
        let d = Desc::from(
            BitfieldDesc::builder()
                .unsigned("a", 3)
                .skip(1)
                .align(8)
                .unsigned("b", 2)
                .build()
                .unwrap(),
        );
        // b lands at bit 8, forcing a two-byte carrier
        assert_eq!(d.size(), 2);
        let v: ValueMap = [("a", Value::Int(0)), ("b", Value::Int(3))]
            .into_iter()
            .collect();
        assert_eq!(
            d.with_endian(Endian::Big).pack(&Value::Map(v)).unwrap(),
            vec![0x03, 0x00]
        );
    }

    #[test]
    fn test_build_errors() {
        // mixed styles
        assert!(BitfieldDesc::builder()
            .unsigned("a", 1)
            .field("b", 4, 2)
            .build()
            .is_err());
        // overlap
        assert!(BitfieldDesc::builder()
            .field("a", 0, 4)
            .field("b", 2, 4)
            .build()
            .is_err());
        // span past an explicit width
        assert!(BitfieldDesc::builder()
            .field("a", 14, 4)
            .width(2)
            .build()
            .is_err());
        // duplicate names
        assert!(BitfieldDesc::builder()
            .unsigned("a", 1)
            .unsigned("a", 1)
            .build()
            .is_err());
    }

    #[test]
    fn test_explicit_wider_carrier() {
        let d = Desc::from(
            BitfieldDesc::builder()
                .unsigned("a", 4)
                .width(4)
                .build()
                .unwrap(),
        )
        .with_endian(Endian::Little);
        assert_eq!(d.size(), 4);
        let v: ValueMap = [("a", Value::Int(0xF))].into_iter().collect();
        assert_eq!(d.pack(&Value::Map(v)).unwrap(), vec![0x0F, 0, 0, 0]);
    }

    #[test]
    fn test_round_trip() {
        let d = Desc::from(
            BitfieldDesc::builder()
                .unsigned("mode", 2)
                .signed("offset", 5)
                .unsigned("flag", 1)
                .build()
                .unwrap(),
        );
        let m: ValueMap = [
            ("mode", Value::Int(2)),
            ("offset", Value::Int(-7)),
            ("flag", Value::Int(1)),
        ]
        .into_iter()
        .collect();
        let bytes = d.pack(&Value::Map(m.clone())).unwrap();
        assert_eq!(d.unpack(&bytes).unwrap(), Value::Map(m));
    }
}
