// Sequences of a single element descriptor: fixed count, greedy, or
// value-terminated

use crate::desc::{Desc, PackCtx, UnpackCtx};
use crate::endian::Endian;
use crate::error::{CodecError, Result};
use crate::value::Value;

/// Array descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDesc {
    elem: Box<Desc>,
    count: Option<usize>,
    terminator: Option<Value>,
    endian: Option<Endian>,
}

impl ArrayDesc {
    fn check_elem(elem: &Desc) -> Result<()> {
        if let Desc::Union(_) = elem {
            if !elem.is_fixed_size() {
                return Err(CodecError::Build(
                    "array element cannot be a variable-size union".into(),
                ));
            }
        }
        Ok(())
    }

    /// Exactly `count` elements.
    pub fn fixed(elem: Desc, count: usize) -> Result<ArrayDesc> {
        Self::check_elem(&elem)?;
        Ok(ArrayDesc {
            elem: Box::new(elem),
            count: Some(count),
            terminator: None,
            endian: None,
        })
    }

    /// As many elements as the input holds.
    pub fn greedy(elem: Desc) -> Result<ArrayDesc> {
        Self::check_elem(&elem)?;
        Ok(ArrayDesc {
            elem: Box::new(elem),
            count: None,
            terminator: None,
            endian: None,
        })
    }

    /// Elements followed by a literal terminator element, which is consumed
    /// on unpack but not part of the value.
    pub fn terminated(elem: Desc, terminator: Value) -> Result<ArrayDesc> {
        Self::check_elem(&elem)?;
        Ok(ArrayDesc {
            elem: Box::new(elem),
            count: None,
            terminator: Some(terminator),
            endian: None,
        })
    }

    pub fn elem(&self) -> &Desc {
        &self.elem
    }

    pub fn count(&self) -> Option<usize> {
        self.count
    }

    pub fn terminator(&self) -> Option<&Value> {
        self.terminator.as_ref()
    }

    pub fn endian(&self) -> Option<Endian> {
        self.endian
    }

    pub(crate) fn set_endian(&mut self, endian: Option<Endian>) {
        self.endian = endian;
    }

    /// Fixed arrays: `count * elem.size`; terminated arrays: the terminator
    /// element; greedy arrays: zero.
    pub fn min_size(&self) -> usize {
        match (self.count, &self.terminator) {
            (Some(n), _) => n * self.elem.size(),
            (None, Some(_)) => self.elem.size(),
            (None, None) => 0,
        }
    }

    pub fn is_fixed_size(&self) -> bool {
        self.count.is_some() && self.elem.is_fixed_size()
    }

    pub fn is_greedy(&self) -> bool {
        self.count.is_none() && self.terminator.is_none()
    }

    pub(crate) fn pack_ctx(&self, value: &Value, ctx: &PackCtx) -> Result<Vec<u8>> {
        let items = value.as_list().ok_or_else(|| {
            CodecError::Constraint(format!("expected element list, got {value:?}"))
        })?;
        let child = PackCtx {
            endian: self.endian.or(ctx.endian),
            ..*ctx
        };

        if let Some(count) = self.count {
            if items.len() > count {
                return Err(CodecError::Constraint(format!(
                    "{} elements exceed the fixed count {count}",
                    items.len()
                )));
            }
        }

        let mut out = Vec::new();
        for item in items {
            out.extend(self.elem.pack_ctx(item, &child)?);
        }
        // short fixed arrays are right-padded with the element default
        if let Some(count) = self.count {
            let default = self.elem.default_value();
            for _ in items.len()..count {
                out.extend(self.elem.pack_ctx(&default, &child)?);
            }
        }
        if let Some(term) = &self.terminator {
            out.extend(self.elem.pack_ctx(term, &child)?);
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
        let mut items = Vec::new();
        let mut rest = buf;

        match (self.count, &self.terminator) {
            (Some(count), _) => {
                for _ in 0..count {
                    let (v, r) = self.elem.unpack_one_ctx(rest, &child)?;
                    items.push(v);
                    rest = r;
                }
            }
            (None, Some(term)) => loop {
                if rest.is_empty() {
                    return Err(CodecError::TerminatorNotFound);
                }
                let (v, r) = match self.elem.unpack_one_ctx(rest, &child) {
                    Ok(ok) => ok,
                    Err(e) if e.is_missing_bytes() => {
                        return Err(CodecError::TerminatorNotFound)
                    }
                    Err(e) => return Err(e),
                };
                rest = r;
                if v == *term {
                    break;
                }
                items.push(v);
            },
            (None, None) => {
                while !rest.is_empty() {
                    let (v, r) = self.elem.unpack_one_ctx(rest, &child)?;
                    items.push(v);
                    rest = r;
                }
            }
        }
        Ok((Value::List(items), rest))
    }

    pub(crate) fn default_value(&self) -> Value {
        match self.count {
            Some(count) => {
                Value::List((0..count).map(|_| self.elem.default_value()).collect())
            }
            None => Value::List(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::int::IntDesc;
    use crate::desc::unions::UnionDesc;

    fn list(items: &[i128]) -> Value {
        Value::List(items.iter().map(|&v| Value::Int(v)).collect())
    }

    #[test]
    fn test_terminated_i8() {
        let d = Desc::from(
            ArrayDesc::terminated(Desc::from(IntDesc::i8()), Value::Int(-1)).unwrap(),
        );
        assert_eq!(
            d.pack(&list(&[1, 2, 3, 4])).unwrap(),
            vec![0x01, 0x02, 0x03, 0x04, 0xFF]
        );

        let (v, rest) = d
            .unpack_one(&[0x01, 0x02, 0x03, 0x04, 0xFF, b't', b'a', b'i', b'l'])
            .unwrap();
        assert_eq!(v, list(&[1, 2, 3, 4]));
        assert_eq!(rest, b"tail");
    }

    #[test]
    fn test_terminator_not_found() {
        let d = Desc::from(
            ArrayDesc::terminated(Desc::from(IntDesc::i8()), Value::Int(-1)).unwrap(),
        );
        assert!(matches!(
            d.unpack(&[1, 2, 3]),
            Err(CodecError::TerminatorNotFound)
        ));
    }

    #[test]
    fn test_fixed_count_pads_with_defaults() {
        let d = Desc::from(ArrayDesc::fixed(Desc::from(IntDesc::u16()), 3).unwrap())
            .with_endian(Endian::Big);
        assert_eq!(
            d.pack(&list(&[0x0102])).unwrap(),
            vec![0x01, 0x02, 0x00, 0x00, 0x00, 0x00]
        );
        assert!(matches!(
            d.pack(&list(&[1, 2, 3, 4])),
            Err(CodecError::Constraint(_))
        ));
    }

    #[test]
    fn test_fixed_count_unpack() {
        let d = Desc::from(ArrayDesc::fixed(Desc::from(IntDesc::u8()), 2).unwrap());
        let (v, rest) = d.unpack_one(&[7, 8, 9]).unwrap();
        assert_eq!(v, list(&[7, 8]));
        assert_eq!(rest, &[9]);
        assert_eq!(d.size(), 2);
        assert!(d.is_fixed_size());
    }

    #[test]
    fn test_greedy_unpack() {
        let d = Desc::from(ArrayDesc::greedy(Desc::from(IntDesc::u16())).unwrap())
            .with_endian(Endian::Big);
        let (v, rest) = d.unpack_one(&[0, 1, 0, 2]).unwrap();
        assert_eq!(v, list(&[1, 2]));
        assert!(rest.is_empty());
        assert!(d.is_greedy());

        // partial trailing element surfaces the inner error
        assert!(matches!(
            d.unpack(&[0, 1, 0]),
            Err(CodecError::MissingBytes { need: 1 })
        ));
    }

    #[test]
    fn test_variable_union_element_rejected() {
        let u = UnionDesc::builder()
            .member("byte", Desc::from(IntDesc::u8()))
            .member("rest", Desc::from(crate::desc::string::StrDesc::greedy()))
            .build()
            .unwrap();
        assert!(ArrayDesc::fixed(Desc::from(u), 2).is_err());

        let fixed = UnionDesc::builder()
            .member("a", Desc::from(IntDesc::u8()))
            .member("b", Desc::from(IntDesc::u16()))
            .build()
            .unwrap();
        assert!(ArrayDesc::fixed(Desc::from(fixed), 2).is_ok());
    }
}
