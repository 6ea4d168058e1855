// Ordered named fields with optional trailing variable-length sizing

use crate::desc::{Desc, PackCtx, UnpackCtx};
use crate::endian::Endian;
use crate::error::{CodecError, Result};
use crate::value::{Value, ValueMap};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Pure function from a partially-unpacked struct to its total byte length.
pub type StructSizeFn = Arc<dyn Fn(&ValueMap) -> usize + Send + Sync>;

/// One struct slot in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Named { name: String, desc: Desc },
    /// Anonymous aggregate whose subfield names are lifted into the parent.
    Unnamed { names: Vec<String>, desc: Desc },
    Pad(usize),
}

impl Slot {
    fn desc(&self) -> Option<&Desc> {
        match self {
            Slot::Named { desc, .. } | Slot::Unnamed { desc, .. } => Some(desc),
            Slot::Pad(_) => None,
        }
    }

    fn min_size(&self) -> usize {
        match self {
            Slot::Pad(n) => *n,
            other => other.desc().map_or(0, Desc::size),
        }
    }

    fn is_fixed(&self) -> bool {
        match self {
            Slot::Pad(_) => true,
            other => other.desc().is_some_and(Desc::is_fixed_size),
        }
    }

    fn is_greedy(&self) -> bool {
        self.desc().is_some_and(Desc::is_greedy)
    }
}

/// Struct descriptor: ordered slots, unique field names, optional size
/// predicate for trailing variable-length data.
#[derive(Clone)]
pub struct StructDesc {
    slots: Arc<Vec<Slot>>,
    size_fn: Option<StructSizeFn>,
    endian: Option<Endian>,
}

impl fmt::Debug for StructDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructDesc")
            .field("slots", &self.slots)
            .field("size_fn", &self.size_fn.as_ref().map(|_| ".."))
            .field("endian", &self.endian)
            .finish()
    }
}

impl PartialEq for StructDesc {
    fn eq(&self, other: &StructDesc) -> bool {
        let fn_eq = match (&self.size_fn, &other.size_fn) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        fn_eq && self.endian == other.endian && self.slots == other.slots
    }
}

impl StructDesc {
    pub fn builder() -> StructBuilder {
        StructBuilder::new()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn endian(&self) -> Option<Endian> {
        self.endian
    }

    pub(crate) fn set_endian(&mut self, endian: Option<Endian>) {
        self.endian = endian;
    }

    pub fn has_size_fn(&self) -> bool {
        self.size_fn.is_some()
    }

    /// Attach a size predicate after construction, so the closure can
    /// capture offsets computed from the built layout.
    pub fn with_size_fn(mut self, f: StructSizeFn) -> StructDesc {
        self.size_fn = Some(f);
        self
    }

    /// Every addressable field name, lifted names included, in order.
    pub fn field_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for slot in self.slots.iter() {
            match slot {
                Slot::Named { name, .. } => names.push(name.clone()),
                Slot::Unnamed { names: lifted, .. } => names.extend(lifted.iter().cloned()),
                Slot::Pad(_) => {}
            }
        }
        names
    }

    /// Byte offset of a field while every slot before it is fixed-size.
    pub fn offset_of(&self, name: &str) -> Result<usize> {
        let mut offset = 0usize;
        for slot in self.slots.iter() {
            match slot {
                Slot::Named { name: n, .. } if n == name => return Ok(offset),
                Slot::Unnamed { names, desc } if names.iter().any(|n| n == name) => {
                    return match desc {
                        Desc::Struct(s) => Ok(offset + s.offset_of(name)?),
                        _ => Ok(offset),
                    };
                }
                _ => {}
            }
            if !slot.is_fixed() {
                return Err(CodecError::Unsupported(format!(
                    "offset_of({name}) crosses a variable-size field"
                )));
            }
            offset += slot.min_size();
        }
        Err(CodecError::UnknownKey(name.to_string()))
    }

    /// Minimum byte count: the sum of every slot's minimum.
    pub fn min_size(&self) -> usize {
        self.slots.iter().map(Slot::min_size).sum()
    }

    pub fn is_fixed_size(&self) -> bool {
        self.size_fn.is_none() && self.slots.iter().all(Slot::is_fixed)
    }

    pub fn is_greedy(&self) -> bool {
        self.size_fn.is_none() && self.slots.iter().any(Slot::is_greedy)
    }

    fn sub_map(map: &ValueMap, names: &[String]) -> ValueMap {
        let mut sub = ValueMap::new();
        for n in names {
            if let Some(v) = map.get(n) {
                sub.insert(n.clone(), v.clone());
            }
        }
        sub
    }

    fn spread(map: &mut ValueMap, value: Value) -> Result<()> {
        match value {
            Value::Map(m) => {
                for (k, v) in m {
                    map.insert(k, v);
                }
            }
            Value::Union(mut u) => {
                for (k, v) in u.spread_entries()? {
                    map.insert(k, v);
                }
            }
            other => {
                return Err(CodecError::Constraint(format!(
                    "anonymous field produced a non-map value: {other:?}"
                )))
            }
        }
        Ok(())
    }

    pub(crate) fn pack_ctx(&self, value: &Value, ctx: &PackCtx) -> Result<Vec<u8>> {
        let map = value.as_map().ok_or_else(|| {
            CodecError::Constraint(format!("expected field map, got {value:?}"))
        })?;
        let child = PackCtx {
            endian: self.endian.or(ctx.endian),
            ..*ctx
        };

        let mut out = Vec::new();
        for slot in self.slots.iter() {
            match slot {
                Slot::Pad(n) => out.extend(std::iter::repeat(0u8).take(*n)),
                Slot::Named { name, desc } => {
                    let v = map
                        .get(name)
                        .cloned()
                        .unwrap_or_else(|| desc.default_value());
                    out.extend(desc.pack_ctx(&v, &child)?);
                }
                Slot::Unnamed { names, desc } => {
                    let sub = Self::sub_map(map, names);
                    out.extend(desc.pack_ctx(&Value::Map(sub), &child)?);
                }
            }
        }

        if let Some(size_fn) = &self.size_fn {
            let total = size_fn(map);
            trace!(total, emitted = out.len(), "struct size predicate on pack");
            out.resize(total, 0);
        }
        Ok(out)
    }

    pub(crate) fn unpack_ctx<'a>(
        &self,
        buf: &'a [u8],
        ctx: &UnpackCtx,
    ) -> Result<(Value, &'a [u8])> {
        let child = UnpackCtx {
            endian: self.endian.or(ctx.endian),
        };
        let mut map = ValueMap::new();
        let mut rest = buf;

        for slot in self.slots.iter() {
            let consumed = buf.len() - rest.len();

            // deferred sizing: a greedy slot under a size predicate decodes
            // from a finite window computed from the fields seen so far
            if let (Some(size_fn), true) = (&self.size_fn, slot.is_greedy()) {
                let total = size_fn(&map);
                trace!(total, consumed, "struct size predicate at greedy slot");
                if total > buf.len() {
                    return Err(CodecError::MissingBytes {
                        need: total - buf.len(),
                    });
                }
                if total < consumed {
                    return Err(CodecError::Constraint(format!(
                        "size predicate returned {total}, but {consumed} bytes are already consumed"
                    )));
                }
                let inner = &buf[consumed..total];
                match slot {
                    Slot::Named { name, desc } => {
                        let (v, _) = desc.unpack_one_ctx(inner, &child)?;
                        map.insert(name.clone(), v);
                    }
                    Slot::Unnamed { desc, .. } => {
                        let (v, _) = desc.unpack_one_ctx(inner, &child)?;
                        Self::spread(&mut map, v)?;
                    }
                    Slot::Pad(_) => unreachable!("pads are never greedy"),
                }
                return Ok((Value::Map(map), &buf[total..]));
            }

            match slot {
                Slot::Pad(n) => {
                    if rest.len() < *n {
                        return Err(CodecError::MissingBytes { need: n - rest.len() });
                    }
                    rest = &rest[*n..];
                }
                Slot::Named { name, desc } => {
                    let (v, r) = desc.unpack_one_ctx(rest, &child)?;
                    map.insert(name.clone(), v);
                    rest = r;
                }
                Slot::Unnamed { desc, .. } => {
                    let (v, r) = desc.unpack_one_ctx(rest, &child)?;
                    Self::spread(&mut map, v)?;
                    rest = r;
                }
            }
        }

        // a predicate without a greedy slot still fixes the total length;
        // bytes past the slots are skipped as padding
        if let Some(size_fn) = &self.size_fn {
            let consumed = buf.len() - rest.len();
            let total = size_fn(&map);
            if total > consumed {
                if total > buf.len() {
                    return Err(CodecError::MissingBytes {
                        need: total - buf.len(),
                    });
                }
                rest = &buf[total..];
            }
        }
        Ok((Value::Map(map), rest))
    }

    pub(crate) fn default_value(&self) -> Value {
        let mut map = ValueMap::new();
        for slot in self.slots.iter() {
            match slot {
                Slot::Named { name, desc } => {
                    map.insert(name.clone(), desc.default_value());
                }
                Slot::Unnamed { desc, .. } => {
                    let _ = Self::spread(&mut map, desc.default_value());
                }
                Slot::Pad(_) => {}
            }
        }
        Value::Map(map)
    }
}

/// Builder for struct descriptors.
#[derive(Default)]
pub struct StructBuilder {
    slots: Vec<PendingSlot>,
    size_fn: Option<StructSizeFn>,
}

enum PendingSlot {
    Named(String, Desc),
    Unnamed(Desc),
    Pad(usize),
}

impl StructBuilder {
    pub fn new() -> StructBuilder {
        StructBuilder {
            slots: Vec::new(),
            size_fn: None,
        }
    }

    pub fn field(mut self, name: impl Into<String>, desc: impl Into<Desc>) -> StructBuilder {
        self.slots.push(PendingSlot::Named(name.into(), desc.into()));
        self
    }

    /// Anonymous struct or union member; its field names join the parent's
    /// namespace.
    pub fn unnamed(mut self, desc: impl Into<Desc>) -> StructBuilder {
        self.slots.push(PendingSlot::Unnamed(desc.into()));
        self
    }

    pub fn pad(mut self, len: usize) -> StructBuilder {
        self.slots.push(PendingSlot::Pad(len));
        self
    }

    pub fn size_fn(mut self, f: StructSizeFn) -> StructBuilder {
        self.size_fn = Some(f);
        self
    }

    pub fn build(self) -> Result<StructDesc> {
        let mut slots = Vec::with_capacity(self.slots.len());
        let mut seen: Vec<String> = Vec::new();
        let mut check = |names: &[String]| -> Result<()> {
            for n in names {
                if seen.contains(n) {
                    return Err(CodecError::Build(format!("duplicate field name: {n}")));
                }
                seen.push(n.clone());
            }
            Ok(())
        };

        for slot in self.slots {
            match slot {
                PendingSlot::Named(name, desc) => {
                    check(std::slice::from_ref(&name))?;
                    slots.push(Slot::Named { name, desc });
                }
                PendingSlot::Unnamed(desc) => {
                    let names = match &desc {
                        Desc::Struct(s) => s.field_names(),
                        Desc::Union(u) => u.member_names(),
                        other => {
                            return Err(CodecError::Build(format!(
                                "anonymous field must be a struct or union, got {other:?}"
                            )))
                        }
                    };
                    check(&names)?;
                    slots.push(Slot::Unnamed { names, desc });
                }
                PendingSlot::Pad(len) => slots.push(Slot::Pad(len)),
            }
        }

        let greedy: Vec<usize> = slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_greedy())
            .map(|(i, _)| i)
            .collect();
        if greedy.len() > 1 {
            return Err(CodecError::Build(
                "a struct may contain at most one greedy field".into(),
            ));
        }
        if let Some(&idx) = greedy.first() {
            if idx != slots.len() - 1 && self.size_fn.is_none() {
                return Err(CodecError::Build(
                    "a greedy field must be last or sized by a size predicate".into(),
                ));
            }
        }

        Ok(StructDesc {
            slots: Arc::new(slots),
            size_fn: self.size_fn,
            endian: None,
        })
    }
}
