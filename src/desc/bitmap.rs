// Named single-bit flags packed into an integer codec

use crate::desc::int::IntDesc;
use crate::desc::{PackCtx, UnpackCtx};
use crate::endian::Endian;
use crate::error::{CodecError, Result};
use crate::value::Value;
use std::sync::Arc;

/// Bitmap descriptor: a set of named bit positions over an integer codec.
#[derive(Debug, Clone, PartialEq)]
pub struct BitmapDesc {
    int: IntDesc,
    bits: Arc<Vec<(String, u32)>>,
    permissive: bool,
    endian: Option<Endian>,
}

impl BitmapDesc {
    pub fn builder() -> BitmapBuilder {
        BitmapBuilder::new()
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

    pub fn is_permissive(&self) -> bool {
        self.permissive
    }

    /// A permissive twin sharing this bitmap's flag names.
    pub fn permissive(&self) -> BitmapDesc {
        BitmapDesc {
            permissive: true,
            bits: Arc::clone(&self.bits),
            ..self.clone()
        }
    }

    pub fn bit_of(&self, name: &str) -> Option<u32> {
        self.bits.iter().find(|(n, _)| n == name).map(|(_, b)| *b)
    }

    pub fn name_of(&self, bit: u32) -> Option<&str> {
        self.bits
            .iter()
            .find(|(_, b)| *b == bit)
            .map(|(n, _)| n.as_str())
    }

    fn resolve_name(&self, name: &str) -> Result<u32> {
        if let Some(b) = self.bit_of(name) {
            return Ok(b);
        }
        if let Some(n) = name.strip_prefix("bit_") {
            if let Ok(b) = n.parse::<u32>() {
                return Ok(b);
            }
        }
        Err(CodecError::Constraint(format!("unknown bitmap flag: {name}")))
    }

    /// Resolve one flag reference: a declared name, `bit_<n>`, or an index.
    pub(crate) fn resolve_bit(&self, value: &Value) -> Result<u32> {
        let total = (self.size() * 8) as u32;
        let bit = match value {
            Value::Int(v) => {
                u32::try_from(*v).map_err(|_| {
                    CodecError::Constraint(format!("negative bit index {v}"))
                })?
            }
            Value::Sym(s) => self.resolve_name(s)?,
            Value::Bytes(b) => self.resolve_name(&String::from_utf8_lossy(b))?,
            other => {
                return Err(CodecError::Constraint(format!(
                    "expected bitmap flag name or index, got {other:?}"
                )))
            }
        };
        if bit >= total {
            return Err(CodecError::Constraint(format!(
                "bit {bit} out of range for a {total}-bit bitmap"
            )));
        }
        Ok(bit)
    }

    pub(crate) fn pack_ctx(&self, value: &Value, ctx: &PackCtx) -> Result<Vec<u8>> {
        let flags = value.as_list().ok_or_else(|| {
            CodecError::Constraint(format!("expected flag list, got {value:?}"))
        })?;
        let mut acc: u64 = 0;
        for flag in flags {
            acc |= 1u64 << self.resolve_bit(flag)?;
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
        let mut set = Vec::new();
        for bit in 0..(self.size() * 8) as u32 {
            if raw & (1u64 << bit) == 0 {
                continue;
            }
            match self.name_of(bit) {
                Some(name) => set.push(Value::sym(name)),
                None if self.permissive => set.push(Value::Sym(format!("bit_{bit}"))),
                None => {
                    return Err(CodecError::Constraint(format!(
                        "bit {bit} is set but has no name"
                    )))
                }
            }
        }
        Ok((Value::List(set), rest))
    }

    pub(crate) fn default_value(&self) -> Value {
        Value::List(Vec::new())
    }
}

/// Builder: `flag` assigns the next free bit, `flag_at` pins a position.
#[derive(Debug)]
pub struct BitmapBuilder {
    int: IntDesc,
    bits: Vec<(String, u32)>,
}

impl Default for BitmapBuilder {
    fn default() -> BitmapBuilder {
        BitmapBuilder::new()
    }
}

impl BitmapBuilder {
    pub fn new() -> BitmapBuilder {
        BitmapBuilder {
            int: IntDesc::u32(),
            bits: Vec::new(),
        }
    }

    pub fn with_int(mut self, int: IntDesc) -> BitmapBuilder {
        self.int = int;
        self
    }

    /// Name the next free bit position.
    pub fn flag(mut self, name: impl Into<String>) -> BitmapBuilder {
        let next = self.bits.iter().map(|(_, b)| *b).max().map_or(0, |m| m + 1);
        self.bits.push((name.into(), next));
        self
    }

    /// Name a specific bit position.
    pub fn flag_at(mut self, name: impl Into<String>, bit: u32) -> BitmapBuilder {
        self.bits.push((name.into(), bit));
        self
    }

    pub fn build(self) -> Result<BitmapDesc> {
        let total = (self.int.width() * 8) as u32;
        for (i, (name, bit)) in self.bits.iter().enumerate() {
            if *bit >= total {
                return Err(CodecError::Build(format!(
                    "bit {bit} for {name} exceeds the {total}-bit codec"
                )));
            }
            if self.bits[..i].iter().any(|(n, _)| n == name) {
                return Err(CodecError::Build(format!("duplicate flag name: {name}")));
            }
            if self.bits[..i].iter().any(|(_, b)| b == bit) {
                return Err(CodecError::Build(format!(
                    "bit {bit} named more than once"
                )));
            }
        }
        Ok(BitmapDesc {
            int: self.int,
            bits: Arc::new(self.bits),
            permissive: false,
            endian: None,
        })
    }
}
