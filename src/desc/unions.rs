// Overlay unions: every member reads the same byte buffer
// Modeled as pack-on-dirty-switch over a canonical buffer rather than
// memory aliasing; dynamic-size unions depend on the preserved tail bytes.

use crate::desc::{Desc, PackCtx, UnpackCtx};
use crate::endian::Endian;
use crate::error::{CodecError, Result};
use crate::value::{Value, ValueMap};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Size predicate over a temporary union view of the buffer; member reads
/// inside it may fail with `MissingBytes`, which drives the pack engine's
/// pad-and-retry loop.
pub type UnionSizeFn = Arc<dyn Fn(&mut UnionValue) -> Result<usize> + Send + Sync>;

const MAX_PAD_ROUNDS: usize = 64;

/// One union member.
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Named { name: String, desc: Desc },
    /// Anonymous aggregate whose subfield names join the member namespace.
    Unnamed { names: Vec<String>, desc: Desc },
}

impl Member {
    fn desc(&self) -> &Desc {
        match self {
            Member::Named { desc, .. } | Member::Unnamed { desc, .. } => desc,
        }
    }

    fn display_name(&self) -> String {
        match self {
            Member::Named { name, .. } => name.clone(),
            Member::Unnamed { names, .. } => format!("<{}>", names.join(",")),
        }
    }
}

pub(crate) struct UnionLayout {
    members: Vec<Member>,
    size_fn: Option<UnionSizeFn>,
}

impl fmt::Debug for UnionLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnionLayout")
            .field("members", &self.members)
            .field("size_fn", &self.size_fn.as_ref().map(|_| ".."))
            .finish()
    }
}

impl UnionLayout {
    fn layout_eq(a: &Arc<UnionLayout>, b: &Arc<UnionLayout>) -> bool {
        if Arc::ptr_eq(a, b) {
            return true;
        }
        a.members == b.members && a.size_fn.is_none() && b.size_fn.is_none()
    }

    /// Locate the member owning `name`: index plus the lifted key, if any.
    fn locate(&self, name: &str) -> Result<(usize, Option<String>)> {
        for (i, member) in self.members.iter().enumerate() {
            match member {
                Member::Named { name: n, .. } if n == name => return Ok((i, None)),
                Member::Unnamed { names, .. } if names.iter().any(|n| n == name) => {
                    return Ok((i, Some(name.to_string())))
                }
                _ => {}
            }
        }
        Err(CodecError::UnknownMember(name.to_string()))
    }
}

/// Union descriptor: members overlaying a shared byte buffer.
#[derive(Debug, Clone)]
pub struct UnionDesc {
    layout: Arc<UnionLayout>,
    endian: Option<Endian>,
}

impl PartialEq for UnionDesc {
    fn eq(&self, other: &UnionDesc) -> bool {
        self.endian == other.endian && UnionLayout::layout_eq(&self.layout, &other.layout)
    }
}

impl UnionDesc {
    pub fn builder() -> UnionBuilder {
        UnionBuilder::new()
    }

    pub fn members(&self) -> &[Member] {
        &self.layout.members
    }

    /// Every addressable member name, lifted names included, in order.
    pub fn member_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for member in &self.layout.members {
            match member {
                Member::Named { name, .. } => names.push(name.clone()),
                Member::Unnamed { names: lifted, .. } => names.extend(lifted.iter().cloned()),
            }
        }
        names
    }

    pub fn endian(&self) -> Option<Endian> {
        self.endian
    }

    pub(crate) fn set_endian(&mut self, endian: Option<Endian>) {
        self.endian = endian;
    }

    pub fn has_size_fn(&self) -> bool {
        self.layout.size_fn.is_some()
    }

    /// Minimum byte count: the largest member minimum.
    pub fn min_size(&self) -> usize {
        self.layout
            .members
            .iter()
            .map(|m| m.desc().size())
            .max()
            .unwrap_or(0)
    }

    pub fn is_greedy(&self) -> bool {
        self.layout.size_fn.is_none()
            && self.layout.members.iter().any(|m| m.desc().is_greedy())
    }

    pub fn is_fixed_size(&self) -> bool {
        self.layout.size_fn.is_none()
            && !self.is_greedy()
            && self.layout.members.iter().all(|m| m.desc().is_fixed_size())
    }

    fn extend_with_pad(bytes: &mut Vec<u8>, total: usize, pad: Option<&[u8]>) {
        while bytes.len() < total {
            let i = bytes.len();
            bytes.push(pad.and_then(|p| p.get(i)).copied().unwrap_or(0));
        }
    }

    fn resize_with_pad(bytes: &mut Vec<u8>, total: usize, pad: Option<&[u8]>) {
        if total < bytes.len() {
            bytes.truncate(total);
        } else {
            Self::extend_with_pad(bytes, total, pad);
        }
    }

    /// Grow/shrink freshly packed member bytes to the union's size,
    /// retrying the size predicate with pad bytes while it runs short.
    fn apply_sizing(
        &self,
        mut bytes: Vec<u8>,
        inherit: Option<Endian>,
        pad: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        if let Some(size_fn) = &self.layout.size_fn {
            let mut rounds = 0;
            loop {
                let mut temp =
                    UnionValue::from_parts(Arc::clone(&self.layout), inherit, bytes.clone());
                temp.freeze();
                match size_fn(&mut temp) {
                    Ok(total) => {
                        Self::resize_with_pad(&mut bytes, total, pad);
                        return Ok(bytes);
                    }
                    Err(CodecError::MissingBytes { need }) if need > 0 => {
                        rounds += 1;
                        if rounds > MAX_PAD_ROUNDS {
                            return Err(CodecError::Constraint(
                                "union size predicate did not converge".into(),
                            ));
                        }
                        let target = bytes.len() + need;
                        trace!(target, "padding union buffer for size predicate");
                        Self::extend_with_pad(&mut bytes, target, pad);
                    }
                    Err(e) => return Err(e),
                }
            }
        } else if !self.is_greedy() {
            Self::extend_with_pad(&mut bytes, self.min_size(), pad);
        }
        Ok(bytes)
    }

    pub(crate) fn pack_ctx(&self, value: &Value, ctx: &PackCtx) -> Result<Vec<u8>> {
        let inherit = self.endian.or(ctx.endian);

        let member_bytes = match value {
            Value::Union(u) => {
                let mut u = (**u).clone();
                u.flush()?;
                u.buf
            }
            Value::Map(map) => {
                // at most one member may be selected
                let mut chosen: Option<usize> = None;
                for key in map.keys() {
                    let (idx, _) = self.layout.locate(key)?;
                    match chosen {
                        None => chosen = Some(idx),
                        Some(prev) if prev != idx => {
                            let (a, b) = (prev.min(idx), prev.max(idx));
                            return Err(CodecError::ConflictingMembers(
                                self.layout.members[a].display_name(),
                                self.layout.members[b].display_name(),
                            ));
                        }
                        _ => {}
                    }
                }
                let idx = chosen.unwrap_or(0);
                let member = &self.layout.members[idx];
                let member_value = match member {
                    Member::Named { name, desc } => map
                        .get(name)
                        .cloned()
                        .unwrap_or_else(|| desc.default_value()),
                    Member::Unnamed { names, .. } => {
                        let mut sub = ValueMap::new();
                        for n in names {
                            if let Some(v) = map.get(n) {
                                sub.insert(n.clone(), v.clone());
                            }
                        }
                        Value::Map(sub)
                    }
                };
                let child = PackCtx {
                    endian: inherit,
                    pad_bytes: None,
                };
                member.desc().pack_ctx(&member_value, &child)?
            }
            other => {
                return Err(CodecError::Constraint(format!(
                    "expected member map or union value, got {other:?}"
                )))
            }
        };

        self.apply_sizing(member_bytes, inherit, ctx.pad_bytes)
    }

    pub(crate) fn unpack_ctx<'a>(
        &self,
        buf: &'a [u8],
        ctx: &UnpackCtx,
    ) -> Result<(Value, &'a [u8])> {
        let inherit = self.endian.or(ctx.endian);

        let total = if let Some(size_fn) = &self.layout.size_fn {
            let mut temp =
                UnionValue::from_parts(Arc::clone(&self.layout), inherit, buf.to_vec());
            temp.freeze();
            let total = size_fn(&mut temp)?;
            if total > buf.len() {
                return Err(CodecError::MissingBytes {
                    need: total - buf.len(),
                });
            }
            total
        } else if self.is_greedy() {
            buf.len()
        } else {
            let n = self.min_size();
            if buf.len() < n {
                return Err(CodecError::MissingBytes {
                    need: n - buf.len(),
                });
            }
            n
        };

        let value = UnionValue::from_parts(
            Arc::clone(&self.layout),
            inherit,
            buf[..total].to_vec(),
        );
        Ok((Value::Union(Box::new(value)), &buf[total..]))
    }

    pub(crate) fn default_value(&self) -> Value {
        match &self.layout.members[0] {
            Member::Named { name, desc } => {
                let mut map = ValueMap::new();
                map.insert(name.clone(), desc.default_value());
                Value::Map(map)
            }
            Member::Unnamed { desc, .. } => desc.default_value(),
        }
    }
}

/// A decoded union instance: canonical byte buffer, one cached active
/// member, and a dirty flag driving flush-before-switch.
#[derive(Clone)]
pub struct UnionValue {
    layout: Arc<UnionLayout>,
    endian: Option<Endian>,
    buf: Vec<u8>,
    active: Option<(usize, Value)>,
    dirty: bool,
    frozen: bool,
}

impl fmt::Debug for UnionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnionValue")
            .field("buf_len", &self.buf.len())
            .field("active", &self.active)
            .field("dirty", &self.dirty)
            .field("frozen", &self.frozen)
            .finish()
    }
}

impl PartialEq for UnionValue {
    fn eq(&self, other: &UnionValue) -> bool {
        if !UnionLayout::layout_eq(&self.layout, &other.layout) {
            return false;
        }
        if !self.dirty && !other.dirty {
            return self.buf == other.buf;
        }
        self.buf == other.buf && self.dirty == other.dirty && self.active == other.active
    }
}

impl UnionValue {
    pub(crate) fn from_parts(
        layout: Arc<UnionLayout>,
        endian: Option<Endian>,
        buf: Vec<u8>,
    ) -> UnionValue {
        UnionValue {
            layout,
            endian,
            buf,
            active: None,
            dirty: false,
            frozen: false,
        }
    }

    /// Read member `name`, flushing any dirty member first.
    pub fn get(&mut self, name: &str) -> Result<Value> {
        let (idx, lifted) = self.layout.locate(name)?;
        let value = match &self.active {
            Some((i, v)) if *i == idx => v.clone(),
            _ => {
                self.flush()?;
                let member = &self.layout.members[idx];
                let ctx = UnpackCtx { endian: self.endian };
                let (v, _) = member.desc().unpack_one_ctx(&self.buf, &ctx)?;
                trace!(member = %member.display_name(), "union member decoded");
                self.active = Some((idx, v.clone()));
                v
            }
        };
        match lifted {
            None => Ok(value),
            Some(key) => match value {
                Value::Map(m) => m
                    .get(&key)
                    .cloned()
                    .ok_or(CodecError::UnknownMember(key)),
                Value::Union(mut u) => u.get(&key),
                other => Err(CodecError::Constraint(format!(
                    "anonymous member produced a non-map value: {other:?}"
                ))),
            },
        }
    }

    /// Write member `name`; the change is packed into the buffer lazily,
    /// before the next cross-member read.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        if self.frozen {
            return Err(CodecError::Unsupported("write to a frozen union".into()));
        }
        let (idx, lifted) = self.layout.locate(name)?;
        match lifted {
            None => {
                if self.active.as_ref().map(|(i, _)| *i) != Some(idx) {
                    self.flush()?;
                }
                self.active = Some((idx, value));
            }
            Some(key) => {
                // read-modify-write of the owning aggregate
                if self.active.as_ref().map(|(i, _)| *i) != Some(idx) {
                    self.flush()?;
                    let member = &self.layout.members[idx];
                    let ctx = UnpackCtx { endian: self.endian };
                    let (v, _) = member.desc().unpack_one_ctx(&self.buf, &ctx)?;
                    self.active = Some((idx, v));
                }
                if let Some((_, current)) = &mut self.active {
                    match current {
                        Value::Map(m) => {
                            m.insert(key, value);
                        }
                        Value::Union(u) => u.set(&key, value)?,
                        other => {
                            return Err(CodecError::Constraint(format!(
                                "anonymous member holds a non-map value: {other:?}"
                            )))
                        }
                    }
                }
            }
        }
        self.dirty = true;
        Ok(())
    }

    /// Disable flushing; the union becomes a read-only view of its buffer.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// The canonical bytes, after flushing any dirty member.
    pub fn bytes(&mut self) -> Result<&[u8]> {
        self.flush()?;
        Ok(&self.buf)
    }

    /// The canonical bytes as-is, without flushing.
    pub fn raw(&self) -> &[u8] {
        &self.buf
    }

    /// The cached active member, if any.
    pub fn cached(&self) -> Option<(String, &Value)> {
        self.active
            .as_ref()
            .map(|(i, v)| (self.layout.members[*i].display_name(), v))
    }

    pub fn member_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for member in &self.layout.members {
            match member {
                Member::Named { name, .. } => names.push(name.clone()),
                Member::Unnamed { names: lifted, .. } => names.extend(lifted.iter().cloned()),
            }
        }
        names
    }

    /// Re-pack the dirty active member into the buffer, preserving the
    /// buffer tail beyond the member's own bytes.
    fn flush(&mut self) -> Result<()> {
        if !self.dirty || self.frozen {
            return Ok(());
        }
        if let Some((idx, value)) = &self.active {
            let member = &self.layout.members[*idx];
            let ctx = PackCtx {
                endian: self.endian,
                pad_bytes: None,
            };
            let bytes = member.desc().pack_ctx(value, &ctx)?;
            trace!(
                member = %member.display_name(),
                len = bytes.len(),
                "union member flushed"
            );
            if bytes.len() >= self.buf.len() {
                self.buf = bytes;
            } else {
                self.buf[..bytes.len()].copy_from_slice(&bytes);
            }
        }
        self.dirty = false;
        Ok(())
    }

    /// Entries to spread into a parent struct when this union is an
    /// anonymous field: the first declared member, decoded from the buffer.
    pub(crate) fn spread_entries(&mut self) -> Result<Vec<(String, Value)>> {
        match self.layout.members.first() {
            Some(Member::Named { name, .. }) => {
                let name = name.clone();
                let v = self.get(&name)?;
                Ok(vec![(name, v)])
            }
            Some(Member::Unnamed { names, .. }) => {
                let names = names.clone();
                names
                    .into_iter()
                    .map(|n| {
                        let v = self.get(&n)?;
                        Ok((n, v))
                    })
                    .collect()
            }
            None => Ok(Vec::new()),
        }
    }
}

/// Builder for union descriptors.
#[derive(Default)]
pub struct UnionBuilder {
    members: Vec<PendingMember>,
    size_fn: Option<UnionSizeFn>,
}

enum PendingMember {
    Named(String, Desc),
    Unnamed(Desc),
}

impl UnionBuilder {
    pub fn new() -> UnionBuilder {
        UnionBuilder {
            members: Vec::new(),
            size_fn: None,
        }
    }

    pub fn member(mut self, name: impl Into<String>, desc: impl Into<Desc>) -> UnionBuilder {
        self.members.push(PendingMember::Named(name.into(), desc.into()));
        self
    }

    /// Anonymous struct or union member; its subfield names join the
    /// member namespace.
    pub fn unnamed(mut self, desc: impl Into<Desc>) -> UnionBuilder {
        self.members.push(PendingMember::Unnamed(desc.into()));
        self
    }

    pub fn size_fn(mut self, f: UnionSizeFn) -> UnionBuilder {
        self.size_fn = Some(f);
        self
    }

    pub fn build(self) -> Result<UnionDesc> {
        if self.members.is_empty() {
            return Err(CodecError::Build("union requires at least one member".into()));
        }
        let mut members = Vec::with_capacity(self.members.len());
        let mut seen: Vec<String> = Vec::new();
        for member in self.members {
            let built = match member {
                PendingMember::Named(name, desc) => {
                    if matches!(desc, Desc::Pad(_)) {
                        return Err(CodecError::Build(
                            "pad is not allowed as a union member".into(),
                        ));
                    }
                    Member::Named { name, desc }
                }
                PendingMember::Unnamed(desc) => {
                    let names = match &desc {
                        Desc::Struct(s) => s.field_names(),
                        Desc::Union(u) => u.member_names(),
                        other => {
                            return Err(CodecError::Build(format!(
                                "anonymous member must be a struct or union, got {other:?}"
                            )))
                        }
                    };
                    Member::Unnamed { names, desc }
                }
            };
            let names: Vec<String> = match &built {
                Member::Named { name, .. } => vec![name.clone()],
                Member::Unnamed { names, .. } => names.clone(),
            };
            for n in names {
                if seen.contains(&n) {
                    return Err(CodecError::Build(format!("duplicate member name: {n}")));
                }
                seen.push(n);
            }
            members.push(built);
        }
        Ok(UnionDesc {
            layout: Arc::new(UnionLayout {
                members,
                size_fn: self.size_fn,
            }),
            endian: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::enums::EnumDesc;
    use crate::desc::int::IntDesc;
    use crate::desc::string::StrDesc;
    use crate::desc::structs::StructDesc;

    fn cmd_enum() -> EnumDesc {
        EnumDesc::builder()
            .with_int(IntDesc::u8())
            .name("invalid")
            .name("hello")
            .name("read")
            .name("write")
            .name("goodbye")
            .build()
            .unwrap()
    }

    /// The protocol frame union from the wire format tests: a command byte
    /// overlaid with per-command struct views.
    fn frame_union() -> UnionDesc {
        let hello = StructDesc::builder()
            .field("type", Desc::from(cmd_enum()))
            .field("version", Desc::from(StrDesc::greedy()))
            .build()
            .unwrap();
        let read = StructDesc::builder()
            .field("type", Desc::from(cmd_enum()))
            .field("offset", Desc::from(IntDesc::u64()))
            .field("len", Desc::from(IntDesc::u64()))
            .build()
            .unwrap();
        UnionDesc::builder()
            .member("hello", Desc::from(hello))
            .member("read", Desc::from(read))
            .member("type", Desc::from(cmd_enum()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_overlayed_member_reads() {
        let d = Desc::from(frame_union()).with_endian(Endian::Big);
        let mut bytes = vec![0x02];
        bytes.extend([0xFE; 8]);
        bytes.extend([0xAB; 8]);

        let mut v = d.unpack(&bytes).unwrap();
        let u = v.as_union_mut().unwrap();
        assert_eq!(u.get("type").unwrap(), Value::sym("read"));

        let read = u.get("read").unwrap();
        let m = read.as_map().unwrap();
        assert_eq!(m.get("type"), Some(&Value::sym("read")));
        assert_eq!(m.get_int("offset"), Some(0xFEFEFEFEFEFEFEFEu64 as i128));
        assert_eq!(m.get_int("len"), Some(0xABABABABABABABABu64 as i128));
    }

    #[test]
    fn test_write_flushes_before_cross_read() {
        let small = Desc::from(IntDesc::u8());
        let wide = Desc::from(IntDesc::u32());
        let d = Desc::from(
            UnionDesc::builder()
                .member("b", small)
                .member("w", wide)
                .build()
                .unwrap(),
        )
        .with_endian(Endian::Big);

        let mut v = d.unpack(&[0x11, 0x22, 0x33, 0x44]).unwrap();
        let u = v.as_union_mut().unwrap();
        assert_eq!(u.get("w").unwrap(), Value::Int(0x11223344));

        // writing the narrow member preserves the wide member's tail
        u.set("b", Value::Int(0xAA)).unwrap();
        assert_eq!(u.get("w").unwrap(), Value::Int(0xAA223344));
        assert_eq!(u.bytes().unwrap(), &[0xAA, 0x22, 0x33, 0x44]);
    }

    #[test]
    fn test_frozen_union_rejects_writes() {
        let d = Desc::from(
            UnionDesc::builder()
                .member("a", Desc::from(IntDesc::u8()))
                .build()
                .unwrap(),
        );
        let mut v = d.unpack(&[1]).unwrap();
        let u = v.as_union_mut().unwrap();
        u.freeze();
        assert!(matches!(
            u.set("a", Value::Int(2)),
            Err(CodecError::Unsupported(_))
        ));
        assert_eq!(u.get("a").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_pack_one_member_only() {
        let d = Desc::from(
            UnionDesc::builder()
                .member("a", Desc::from(IntDesc::u8()))
                .member("b", Desc::from(IntDesc::u16()))
                .build()
                .unwrap(),
        )
        .with_endian(Endian::Big);

        // one member: padded out to the union size
        let v: ValueMap = [("a", Value::Int(5))].into_iter().collect();
        assert_eq!(d.pack(&Value::Map(v)).unwrap(), vec![5, 0]);

        // empty map packs the first member's default
        assert_eq!(d.pack(&Value::Map(ValueMap::new())).unwrap(), vec![0, 0]);

        // two members conflict
        let v: ValueMap = [("a", Value::Int(1)), ("b", Value::Int(2))]
            .into_iter()
            .collect();
        assert!(matches!(
            d.pack(&Value::Map(v)),
            Err(CodecError::ConflictingMembers(_, _))
        ));

        // unknown member names fail
        let v: ValueMap = [("zzz", Value::Int(1))].into_iter().collect();
        assert!(matches!(
            d.pack(&Value::Map(v)),
            Err(CodecError::UnknownMember(_))
        ));
    }

    /// Dynamic-size union whose length lives inside one member.
    fn sized_union() -> UnionDesc {
        let inner = StructDesc::builder()
            .field("head", Desc::from(IntDesc::u32()))
            .field("size", Desc::from(IntDesc::u8()))
            .build()
            .unwrap();
        UnionDesc::builder()
            .member("type", Desc::from(IntDesc::u8()))
            .member("inner", Desc::from(inner))
            .size_fn(Arc::new(|u| {
                let inner = u.get("inner")?;
                let size = inner
                    .as_map()
                    .and_then(|m| m.get_int("size"))
                    .unwrap_or(0);
                Ok(size as usize)
            }))
            .build()
            .unwrap()
    }

    #[test]
    fn test_dynamic_size_pack_with_pad_bytes() {
        use crate::desc::PackOpts;

        let d = Desc::from(sized_union());

        // pad bytes claim a one-byte union: the packed member shrinks to it
        let v: ValueMap = [("type", Value::Int(5))].into_iter().collect();
        let opts = PackOpts::new().pad_bytes(b"\0\0\0\0\x01");
        assert_eq!(d.pack_with(&Value::Map(v), opts).unwrap(), vec![0x05]);

        // pad bytes claim five: the member is padded out with them
        let v: ValueMap = [("type", Value::Int(0x0F))].into_iter().collect();
        let opts = PackOpts::new().pad_bytes(b"\0\0\0\0\x05");
        assert_eq!(
            d.pack_with(&Value::Map(v), opts).unwrap(),
            vec![0x0F, 0x00, 0x00, 0x00, 0x05]
        );
    }

    #[test]
    fn test_dynamic_size_unpack() {
        let d = Desc::from(sized_union());
        let bytes = [0x0F, 0x00, 0x00, 0x00, 0x05, 0xEE, 0xEE];
        let (mut v, rest) = d.unpack_one(&bytes).unwrap();
        assert_eq!(rest, &[0xEE, 0xEE]);
        let u = v.as_union_mut().unwrap();
        assert_eq!(u.get("type").unwrap(), Value::Int(0x0F));

        // shorter input than the predicted size is an error
        assert!(matches!(
            d.unpack(&[0x0F, 0x00, 0x00, 0x00, 0x08, 0x01]),
            Err(CodecError::MissingBytes { need: 2 })
        ));
    }

    #[test]
    fn test_greedy_union_consumes_all() {
        let d = Desc::from(frame_union());
        let bytes = [0x01, b'v', b'1'];
        let (_, rest) = d.unpack_one(&bytes).unwrap();
        assert!(rest.is_empty());
    }

    #[test]
    fn test_build_errors() {
        use crate::desc::pad::PadDesc;

        assert!(UnionDesc::builder().build().is_err());
        assert!(UnionDesc::builder()
            .member("p", Desc::from(PadDesc::new(2)))
            .build()
            .is_err());
        assert!(UnionDesc::builder()
            .member("a", Desc::from(IntDesc::u8()))
            .member("a", Desc::from(IntDesc::u16()))
            .build()
            .is_err());
    }

    #[test]
    fn test_lifted_member_names() {
        let inner = StructDesc::builder()
            .field("x", Desc::from(IntDesc::u8()))
            .field("y", Desc::from(IntDesc::u8()))
            .build()
            .unwrap();
        let d = UnionDesc::builder()
            .member("tag", Desc::from(IntDesc::u16()))
            .unnamed(Desc::from(inner))
            .build()
            .unwrap();
        assert_eq!(d.member_names(), vec!["tag", "x", "y"]);

        let desc = Desc::from(d).with_endian(Endian::Big);
        let mut v = desc.unpack(&[0x01, 0x02]).unwrap();
        let u = v.as_union_mut().unwrap();
        assert_eq!(u.get("x").unwrap(), Value::Int(1));
        assert_eq!(u.get("y").unwrap(), Value::Int(2));
        assert_eq!(u.get("tag").unwrap(), Value::Int(0x0102));

        u.set("y", Value::Int(0xFF)).unwrap();
        assert_eq!(u.get("tag").unwrap(), Value::Int(0x01FF));
    }
}
