// Symbol <-> integer maps over an integer codec

use crate::desc::int::IntDesc;
use crate::desc::{PackCtx, UnpackCtx};
use crate::endian::Endian;
use crate::error::{CodecError, Result};
use crate::value::Value;
use std::sync::Arc;

/// Enumeration descriptor: named constants over an integer codec.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumDesc {
    int: IntDesc,
    syms: Arc<Vec<(String, i128)>>,
    default_sym: String,
    permissive: bool,
    endian: Option<Endian>,
}

impl EnumDesc {
    pub fn builder() -> EnumBuilder {
        EnumBuilder::new()
    }

    /// Shortcut for a plain name list over the default u32 codec.
    pub fn of<S: AsRef<str>>(names: &[S]) -> Result<EnumDesc> {
        let mut b = EnumBuilder::new();
        for n in names {
            b = b.name(n.as_ref());
        }
        b.build()
    }

    pub fn int(&self) -> IntDesc {
        self.int
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

    /// A permissive twin sharing this enum's symbol map.
    pub fn permissive(&self) -> EnumDesc {
        EnumDesc {
            permissive: true,
            syms: Arc::clone(&self.syms),
            ..self.clone()
        }
    }

    pub fn default_sym(&self) -> &str {
        &self.default_sym
    }

    pub fn value_of(&self, name: &str) -> Option<i128> {
        self.syms
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn name_of(&self, value: i128) -> Option<&str> {
        self.syms
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(n, _)| n.as_str())
    }

    fn synthetic_sym(&self, raw: u64) -> String {
        format!("unknown_{:0width$x}", raw, width = self.size() * 2)
    }

    /// Resolve a pack input to the integer to emit.
    pub(crate) fn resolve(&self, value: &Value) -> Result<i128> {
        let name = match value {
            Value::Int(v) => return Ok(*v),
            Value::Sym(s) => s.clone(),
            Value::Bytes(b) => String::from_utf8_lossy(b).to_string(),
            other => {
                return Err(CodecError::Constraint(format!(
                    "expected enum symbol or integer, got {other:?}"
                )))
            }
        };
        if let Some(v) = self.value_of(&name) {
            return Ok(v);
        }
        if self.permissive {
            if let Some(hex) = name.strip_prefix("unknown_") {
                if let Ok(raw) = u64::from_str_radix(hex, 16) {
                    return Ok(self.int.value_from_bits(raw));
                }
            }
        }
        Err(CodecError::Constraint(format!("unknown enum symbol: {name}")))
    }

    pub(crate) fn pack_ctx(&self, value: &Value, ctx: &PackCtx) -> Result<Vec<u8>> {
        let v = self.resolve(value)?;
        let child = PackCtx {
            endian: self.endian.or(ctx.endian),
            ..*ctx
        };
        self.int.pack_ctx(&Value::Int(v), &child)
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
        let raw = v.as_int().unwrap_or(0);
        match self.name_of(raw) {
            Some(name) => Ok((Value::sym(name), rest)),
            None if self.permissive => {
                Ok((Value::Sym(self.synthetic_sym(self.int.raw_bits(raw))), rest))
            }
            None => Err(CodecError::Constraint(format!(
                "no enum symbol for value {raw}"
            ))),
        }
    }

    pub(crate) fn default_value(&self) -> Value {
        Value::sym(&self.default_sym)
    }
}

/// Builder: bare names count up from the largest assigned value, explicit
/// values set exactly that.
#[derive(Debug)]
pub struct EnumBuilder {
    int: IntDesc,
    syms: Vec<(String, i128)>,
    default_sym: Option<String>,
    permissive: bool,
}

impl Default for EnumBuilder {
    fn default() -> EnumBuilder {
        EnumBuilder::new()
    }
}

impl EnumBuilder {
    pub fn new() -> EnumBuilder {
        EnumBuilder {
            int: IntDesc::u32(),
            syms: Vec::new(),
            default_sym: None,
            permissive: false,
        }
    }

    /// Change the underlying integer codec (default u32).
    pub fn with_int(mut self, int: IntDesc) -> EnumBuilder {
        self.int = int;
        self
    }

    /// Append a name at the next value: `max(assigned) + 1`, starting at 0.
    pub fn name(mut self, name: impl Into<String>) -> EnumBuilder {
        let next = self
            .syms
            .iter()
            .map(|(_, v)| *v)
            .max()
            .map_or(0, |m| m + 1);
        self.syms.push((name.into(), next));
        self
    }

    /// Append a name with an explicit value.
    pub fn value(mut self, name: impl Into<String>, value: i128) -> EnumBuilder {
        self.syms.push((name.into(), value));
        self
    }

    /// Override the default symbol (otherwise the first defined name).
    pub fn default_sym(mut self, name: impl Into<String>) -> EnumBuilder {
        self.default_sym = Some(name.into());
        self
    }

    pub fn permissive(mut self) -> EnumBuilder {
        self.permissive = true;
        self
    }

    pub fn build(self) -> Result<EnumDesc> {
        if self.syms.is_empty() {
            return Err(CodecError::Build("enum requires at least one symbol".into()));
        }
        for (i, (name, value)) in self.syms.iter().enumerate() {
            if self.syms[..i].iter().any(|(n, _)| n == name) {
                return Err(CodecError::Build(format!("duplicate enum symbol: {name}")));
            }
            self.int.check_range(*value).map_err(|_| {
                CodecError::Build(format!(
                    "enum value {value} for {name} not representable by the underlying codec"
                ))
            })?;
        }
        let default_sym = match self.default_sym {
            Some(name) => {
                if !self.syms.iter().any(|(n, _)| *n == name) {
                    return Err(CodecError::Build(format!(
                        "default symbol {name} is not defined"
                    )));
                }
                name
            }
            None => self.syms[0].0.clone(),
        };
        Ok(EnumDesc {
            int: self.int,
            syms: Arc::new(self.syms),
            default_sym,
            permissive: self.permissive,
            endian: None,
        })
    }
}
