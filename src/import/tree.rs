// Node model for compiler-emitted C type trees and the descriptor resolver

use crate::desc::{
    ArrayDesc, Desc, EnumDesc, IntDesc, StrDesc, StructDesc, UnionDesc,
};
use crate::error::{CodecError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One enumerator constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValueNode {
    pub name: String,
    pub init: i64,
}

/// One node of the compiler's type tree, keyed by id in a `CTree`.
/// Sizes and offsets are in bits, as the compiler emits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CNode {
    FundamentalType {
        name: String,
        size: u32,
    },
    Typedef {
        name: String,
        #[serde(rename = "type")]
        ty: String,
    },
    PointerType {
        size: Option<u32>,
    },
    CvQualifiedType {
        #[serde(rename = "type")]
        ty: String,
    },
    ElaboratedType {
        #[serde(rename = "type")]
        ty: String,
    },
    ArrayType {
        #[serde(rename = "type")]
        ty: String,
        count: usize,
    },
    Struct {
        name: String,
        members: Vec<String>,
    },
    Union {
        name: String,
        members: Vec<String>,
    },
    Enumeration {
        name: String,
        size: Option<u32>,
        values: Vec<EnumValueNode>,
    },
    Field {
        name: String,
        #[serde(rename = "type")]
        ty: String,
        offset: Option<u64>,
    },
}

/// A compiler-emitted type tree: id -> node, plus the target pointer width.
#[derive(Debug, Clone, Default)]
pub struct CTree {
    nodes: HashMap<String, CNode>,
    pointer_bits: u32,
}

impl CTree {
    pub fn new() -> CTree {
        CTree {
            nodes: HashMap::new(),
            pointer_bits: 64,
        }
    }

    pub fn with_pointer_bits(mut self, bits: u32) -> CTree {
        self.pointer_bits = bits;
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, node: CNode) {
        self.nodes.insert(id.into(), node);
    }

    pub fn get(&self, id: &str) -> Option<&CNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolve a node id to a descriptor.
    pub fn resolve(&self, id: &str) -> Result<Desc> {
        self.resolve_inner(id, &mut Vec::new())
    }

    /// Resolve a struct/union/enum/typedef by its declared name.
    pub fn resolve_named(&self, name: &str) -> Result<Desc> {
        let id = self
            .nodes
            .iter()
            .find(|(_, node)| match node {
                CNode::Struct { name: n, .. }
                | CNode::Union { name: n, .. }
                | CNode::Enumeration { name: n, .. }
                | CNode::Typedef { name: n, .. } => n == name,
                _ => false,
            })
            .map(|(id, _)| id.clone())
            .ok_or_else(|| CodecError::Build(format!("no type named {name}")))?;
        self.resolve(&id)
    }

    fn node(&self, id: &str) -> Result<&CNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| CodecError::Build(format!("dangling node id: {id}")))
    }

    fn entry<'a>(&'a self, id: &str) -> Result<(&'a String, &'a CNode)> {
        self.nodes
            .get_key_value(id)
            .ok_or_else(|| CodecError::Build(format!("dangling node id: {id}")))
    }

    /// Follow typedef/cv-qualifier/elaborated wrappers to the base node.
    fn peel<'a>(&'a self, id: &str) -> Result<(&'a str, &'a CNode)> {
        let mut entry = self.entry(id)?;
        for _ in 0..self.nodes.len() + 1 {
            match entry.1 {
                CNode::Typedef { ty, .. }
                | CNode::CvQualifiedType { ty }
                | CNode::ElaboratedType { ty } => entry = self.entry(ty)?,
                _ => return Ok((entry.0.as_str(), entry.1)),
            }
        }
        Err(CodecError::Build(format!("typedef cycle at {id}")))
    }

    fn resolve_inner(&self, id: &str, stack: &mut Vec<String>) -> Result<Desc> {
        if stack.iter().any(|s| s == id) {
            return Err(CodecError::Build(format!("cyclic type reference at {id}")));
        }
        stack.push(id.to_string());
        let out = self.resolve_node(id, stack);
        stack.pop();
        out
    }

    fn resolve_node(&self, id: &str, stack: &mut Vec<String>) -> Result<Desc> {
        match self.node(id)? {
            CNode::FundamentalType { name, size } => fundamental(name, *size),
            CNode::Typedef { ty, .. }
            | CNode::CvQualifiedType { ty }
            | CNode::ElaboratedType { ty } => self.resolve_inner(ty, stack),
            CNode::PointerType { size } => {
                let bits = size.unwrap_or(self.pointer_bits);
                Ok(Desc::from(IntDesc::new((bits / 8) as usize, false)?))
            }
            CNode::ArrayType { ty, count } => {
                let (_, base) = self.peel(ty)?;
                if let CNode::FundamentalType { name, size: 8 } = base {
                    if name.contains("char") {
                        // char[N] keeps its NULs
                        return Ok(Desc::from(StrDesc::fixed(*count).trim(false)));
                    }
                }
                let elem = self.resolve_inner(ty, stack)?;
                Ok(Desc::from(ArrayDesc::fixed(elem, *count)?))
            }
            CNode::Struct { members, .. } => self.resolve_struct(members, stack),
            CNode::Union { members, .. } => self.resolve_union(members, stack),
            CNode::Enumeration { size, values, .. } => {
                let bytes = (size.unwrap_or(32) / 8) as usize;
                let mut b = EnumDesc::builder().with_int(IntDesc::new(bytes, false)?);
                for v in values {
                    b = b.value(v.name.clone(), v.init as i128);
                }
                Ok(Desc::from(b.build()?))
            }
            CNode::Field { name, .. } => Err(CodecError::Build(format!(
                "field {name} referenced as a type"
            ))),
        }
    }

    fn field<'a>(&'a self, id: &str) -> Result<(&'a str, &'a str, Option<u64>)> {
        match self.node(id)? {
            CNode::Field { name, ty, offset } => Ok((name.as_str(), ty.as_str(), *offset)),
            other => Err(CodecError::Build(format!(
                "member id {id} is not a field: {other:?}"
            ))),
        }
    }

    fn resolve_struct(&self, members: &[String], stack: &mut Vec<String>) -> Result<Desc> {
        let mut b = StructDesc::builder();
        let mut expected = 0usize;

        for member_id in members {
            let (name, ty, offset_bits) = self.field(member_id)?;
            let offset = (offset_bits.unwrap_or(0) / 8) as usize;
            if offset > expected {
                b = b.pad(offset - expected);
                expected = offset;
            }
            let desc = self.resolve_inner(ty, stack)?;
            if name.is_empty() {
                // anonymous aggregates do not advance the running offset
                b = b.unnamed(desc);
            } else {
                expected = offset.max(expected) + desc.size();
                b = b.field(name, desc);
            }
        }
        Ok(Desc::from(b.build()?))
    }

    fn resolve_union(&self, members: &[String], stack: &mut Vec<String>) -> Result<Desc> {
        let mut b = UnionDesc::builder();
        for member_id in members {
            let (name, ty, _) = self.field(member_id)?;
            let desc = self.resolve_inner(ty, stack)?;
            if name.is_empty() {
                b = b.unnamed(desc);
            } else {
                b = b.member(name, desc);
            }
        }
        Ok(Desc::from(b.build()?))
    }
}

/// Map a fundamental type by size and signedness; 128-bit fundamentals
/// become an array of two 64-bit halves.
fn fundamental(name: &str, size_bits: u32) -> Result<Desc> {
    if size_bits == 128 {
        let half = if name.contains("unsigned") {
            IntDesc::u64()
        } else {
            IntDesc::i64()
        };
        return Ok(Desc::from(ArrayDesc::fixed(Desc::from(half), 2)?));
    }
    let bytes = (size_bits / 8) as usize;
    let unsigned = name.contains("unsigned") || name.contains("_Bool") || name == "bool";
    IntDesc::new(bytes, !unsigned)
        .map(Desc::from)
        .map_err(|_| {
            CodecError::Build(format!("unsupported fundamental {name} of {size_bits} bits"))
        })
}
