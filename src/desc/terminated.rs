// Locate-and-append terminator wrapper around any descriptor

use crate::desc::{Desc, PackCtx, UnpackCtx};
use crate::endian::{self, Endian};
use crate::error::{CodecError, Result};
use crate::value::Value;
use nom::bytes::complete::take_until;
use std::fmt;
use std::sync::Arc;

/// Finds the terminator: `(value_byte_len, terminator_byte_len)` or None.
pub type LocateFn = dyn Fn(&[u8], Endian) -> Option<(usize, usize)> + Send + Sync;

/// Produces the terminator bytes to append after the packed inner value.
pub type TerminateFn = dyn Fn(&[u8], Endian) -> Vec<u8> + Send + Sync;

#[derive(Clone)]
enum Terminator {
    Literal(Vec<u8>),
    Custom {
        locate: Arc<LocateFn>,
        terminate: Arc<TerminateFn>,
    },
}

impl fmt::Debug for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Literal(seq) => f.debug_tuple("Literal").field(seq).finish(),
            Terminator::Custom { .. } => f.write_str("Custom(..)"),
        }
    }
}

impl PartialEq for Terminator {
    fn eq(&self, other: &Terminator) -> bool {
        match (self, other) {
            (Terminator::Literal(a), Terminator::Literal(b)) => a == b,
            (
                Terminator::Custom { locate: l1, terminate: t1 },
                Terminator::Custom { locate: l2, terminate: t2 },
            ) => Arc::ptr_eq(l1, l2) && Arc::ptr_eq(t1, t2),
            _ => false,
        }
    }
}

/// Wrapper adding a terminator around any descriptor: pack appends it,
/// unpack splits the input at it.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminatedDesc {
    inner: Box<Desc>,
    term: Terminator,
    endian: Option<Endian>,
}

impl TerminatedDesc {
    /// Terminate with a literal byte sequence, located at its first
    /// occurrence.
    pub fn literal(inner: Desc, seq: &[u8]) -> Result<TerminatedDesc> {
        if seq.is_empty() {
            return Err(CodecError::Build("terminator sequence is empty".into()));
        }
        Ok(TerminatedDesc {
            inner: Box::new(inner),
            term: Terminator::Literal(seq.to_vec()),
            endian: None,
        })
    }

    /// Terminate with caller-supplied locate/terminate functions.
    pub fn custom(
        inner: Desc,
        locate: Arc<LocateFn>,
        terminate: Arc<TerminateFn>,
    ) -> TerminatedDesc {
        TerminatedDesc {
            inner: Box::new(inner),
            term: Terminator::Custom { locate, terminate },
            endian: None,
        }
    }

    pub fn inner(&self) -> &Desc {
        &self.inner
    }

    pub fn endian(&self) -> Option<Endian> {
        self.endian
    }

    pub(crate) fn set_endian(&mut self, endian: Option<Endian>) {
        self.endian = endian;
    }

    /// Minimum byte count: the inner minimum plus a literal terminator.
    pub fn min_size(&self) -> usize {
        let term = match &self.term {
            Terminator::Literal(seq) => seq.len(),
            Terminator::Custom { .. } => 0,
        };
        self.inner.size() + term
    }

    fn locate(&self, buf: &[u8], eff: Endian) -> Option<(usize, usize)> {
        match &self.term {
            Terminator::Literal(seq) => {
                let found: nom::IResult<&[u8], &[u8]> = take_until(seq.as_slice())(buf);
                match found {
                    Ok((_, before)) => Some((before.len(), seq.len())),
                    Err(_) => None,
                }
            }
            Terminator::Custom { locate, .. } => locate(buf, eff),
        }
    }

    fn terminate(&self, packed: &[u8], eff: Endian) -> Vec<u8> {
        match &self.term {
            Terminator::Literal(seq) => seq.clone(),
            Terminator::Custom { terminate, .. } => terminate(packed, eff),
        }
    }

    pub(crate) fn pack_ctx(&self, value: &Value, ctx: &PackCtx) -> Result<Vec<u8>> {
        let child = PackCtx {
            endian: self.endian.or(ctx.endian),
            ..*ctx
        };
        let mut out = self.inner.pack_ctx(value, &child)?;
        let eff = endian::effective(self.endian, ctx.endian);
        let term = self.terminate(&out, eff);
        out.extend(term);
        Ok(out)
    }

    pub(crate) fn unpack_ctx<'a>(
        &self,
        buf: &'a [u8],
        ctx: &UnpackCtx,
    ) -> Result<(Value, &'a [u8])> {
        let eff = endian::effective(self.endian, ctx.endian);
        let (value_len, term_len) = self
            .locate(buf, eff)
            .ok_or(CodecError::TerminatorNotFound)?;
        let child = UnpackCtx {
            endian: self.endian.or(ctx.endian),
        };
        let (value, _) = self.inner.unpack_one_ctx(&buf[..value_len], &child)?;
        Ok((value, &buf[value_len + term_len..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::string::StrDesc;

    #[test]
    fn test_terminated_string() {
        let d = StrDesc::greedy().terminated(b"STOP").unwrap();
        let (v, rest) = d
            .unpack_one(b"this is the messageSTOPnext messageSTOP")
            .unwrap();
        assert_eq!(v, Value::from("this is the message"));
        assert_eq!(rest, b"next messageSTOP");

        let (v2, rest2) = d.unpack_one(rest).unwrap();
        assert_eq!(v2, Value::from("next message"));
        assert!(rest2.is_empty());
    }

    #[test]
    fn test_pack_appends_terminator() {
        let d = StrDesc::greedy().terminated(b"\0").unwrap();
        assert_eq!(d.pack(&Value::from("hi")).unwrap(), b"hi\0".to_vec());
    }

    #[test]
    fn test_terminator_not_found() {
        let d = StrDesc::greedy().terminated(b"STOP").unwrap();
        assert!(matches!(
            d.unpack_one(b"no marker here"),
            Err(CodecError::TerminatorNotFound)
        ));
    }

    #[test]
    fn test_custom_locator() {
        // length-prefixed region: first byte is the value length
        let locate: Arc<LocateFn> = Arc::new(|buf, _| {
            buf.first()
                .map(|&len| (1 + len as usize, 0))
                .filter(|(v, _)| *v <= buf.len())
        });
        let terminate: Arc<TerminateFn> = Arc::new(|_, _| Vec::new());
        let inner = Desc::from(StrDesc::greedy());
        let d = Desc::Terminated(TerminatedDesc::custom(inner, locate, terminate));

        let (v, rest) = d.unpack_one(b"\x02okrest").unwrap();
        // the inner greedy string sees the whole located region
        assert_eq!(v, Value::Bytes(b"\x02ok".to_vec()));
        assert_eq!(rest, b"rest");
    }

    #[test]
    fn test_round_trip_prefix_law() {
        let d = StrDesc::greedy().terminated(b";").unwrap();
        let input = b"alpha;beta;";
        let (v, _) = d.unpack_one(input).unwrap();
        let repacked = d.pack(&v).unwrap();
        assert!(input.starts_with(&repacked[..]));
    }

    #[test]
    fn test_empty_terminator_rejected() {
        assert!(StrDesc::greedy().terminated(b"").is_err());
    }
}
