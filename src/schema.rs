// Value-shape and range validation run once at the top of a pack call
// Nested packs skip it; unpack never needs it (bytes drive shape).

use crate::desc::Desc;
use crate::error::{CodecError, Result};
use crate::value::{Value, ValueMap};

/// Check `value` against `desc` and return the normalized value: known
/// keys only, per-field shapes and ranges enforced, defaults filled in.
pub fn validate(desc: &Desc, value: &Value) -> Result<Value> {
    match desc {
        Desc::Int(d) => {
            let v = value.as_int().ok_or_else(|| {
                CodecError::Constraint(format!("expected integer, got {value:?}"))
            })?;
            d.check_range(v)?;
            Ok(Value::Int(v))
        }
        Desc::Enum(d) => {
            let v = d.resolve(value)?;
            d.int().check_range(v)?;
            Ok(value.clone())
        }
        Desc::Bitmap(d) => {
            let flags = value.as_list().ok_or_else(|| {
                CodecError::Constraint(format!("expected flag list, got {value:?}"))
            })?;
            for flag in flags {
                d.resolve_bit(flag)?;
            }
            Ok(value.clone())
        }
        Desc::Bitfield(d) => validate_bitfield(d, value),
        Desc::Str(d) => {
            let bytes = value.as_bytes().ok_or_else(|| {
                CodecError::Constraint(format!("expected byte string, got {value:?}"))
            })?;
            if d.is_fixed() && bytes.len() > d.size() {
                return Err(CodecError::Constraint(format!(
                    "string of {} bytes exceeds fixed size {}",
                    bytes.len(),
                    d.size()
                )));
            }
            Ok(value.clone())
        }
        Desc::Array(d) => {
            let items = value.as_list().ok_or_else(|| {
                CodecError::Constraint(format!("expected element list, got {value:?}"))
            })?;
            if let Some(count) = d.count() {
                if items.len() > count {
                    return Err(CodecError::Constraint(format!(
                        "{} elements exceed the fixed count {count}",
                        items.len()
                    )));
                }
            }
            let validated = items
                .iter()
                .map(|item| validate(d.elem(), item))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::List(validated))
        }
        Desc::Terminated(d) => validate(d.inner(), value),
        Desc::Pad(_) => Ok(Value::Null),
        Desc::Struct(d) => validate_struct(d, value),
        Desc::Union(d) => validate_union(d, value),
    }
}

fn validate_bitfield(d: &crate::desc::BitfieldDesc, value: &Value) -> Result<Value> {
    let map = value.as_map().ok_or_else(|| {
        CodecError::Constraint(format!("expected field map, got {value:?}"))
    })?;
    for key in map.keys() {
        if d.slot(key).is_none() {
            return Err(CodecError::UnknownField(key.clone()));
        }
    }
    let mut out = ValueMap::new();
    for slot in d.slots() {
        let v = map.get_int(&slot.name).unwrap_or(0);
        if v < slot.min() || v > slot.max() {
            return Err(CodecError::Constraint(format!(
                "value {v} out of range [{}, {}] for {}-bit field {}",
                slot.min(),
                slot.max(),
                slot.bits,
                slot.name
            )));
        }
        out.insert(slot.name.clone(), Value::Int(v));
    }
    Ok(Value::Map(out))
}

fn validate_struct(d: &crate::desc::StructDesc, value: &Value) -> Result<Value> {
    let map = value.as_map().ok_or_else(|| {
        CodecError::Constraint(format!("expected field map, got {value:?}"))
    })?;

    let known = d.field_names();
    for key in map.keys() {
        if !known.iter().any(|n| n == key) {
            return Err(CodecError::UnknownKey(key.clone()));
        }
    }

    let mut out = ValueMap::new();
    for slot in d.slots() {
        match slot {
            crate::desc::Slot::Pad(_) => {}
            crate::desc::Slot::Named { name, desc } => {
                let v = match map.get(name) {
                    Some(v) => validate(desc, v)?,
                    None => desc.default_value(),
                };
                out.insert(name.clone(), v);
            }
            crate::desc::Slot::Unnamed { names, desc } => {
                let mut sub = ValueMap::new();
                for n in names {
                    if let Some(v) = map.get(n) {
                        sub.insert(n.clone(), v.clone());
                    }
                }
                let validated = validate(desc, &Value::Map(sub))?;
                if let Value::Map(m) = validated {
                    for (k, v) in m {
                        out.insert(k, v);
                    }
                }
            }
        }
    }
    Ok(Value::Map(out))
}

fn validate_union(d: &crate::desc::UnionDesc, value: &Value) -> Result<Value> {
    let map = match value {
        Value::Union(_) => return Ok(value.clone()),
        Value::Map(m) => m,
        other => {
            return Err(CodecError::Constraint(format!(
                "expected member map or union value, got {other:?}"
            )))
        }
    };
    let known = d.member_names();
    for key in map.keys() {
        if !known.iter().any(|n| n == key) {
            return Err(CodecError::UnknownMember(key.clone()));
        }
    }
    // member-selection conflicts are detected during pack, where member
    // grouping is known; here only shapes are checked
    for member in d.members() {
        match member {
            crate::desc::Member::Named { name, desc } => {
                if let Some(v) = map.get(name) {
                    validate(desc, v)?;
                }
            }
            crate::desc::Member::Unnamed { names, desc } => {
                if names.iter().any(|n| map.contains_key(n)) {
                    let mut sub = ValueMap::new();
                    for n in names {
                        if let Some(v) = map.get(n) {
                            sub.insert(n.clone(), v.clone());
                        }
                    }
                    validate(desc, &Value::Map(sub))?;
                }
            }
        }
    }
    Ok(value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::{BitfieldDesc, IntDesc, StrDesc, StructDesc};

    #[test]
    fn test_unknown_key_rejected() {
        let d = Desc::from(
            StructDesc::builder()
                .field("a", Desc::from(IntDesc::u8()))
                .build()
                .unwrap(),
        );
        let v: ValueMap = [("bogus", Value::Int(1))].into_iter().collect();
        assert!(matches!(
            validate(&d, &Value::Map(v)),
            Err(CodecError::UnknownKey(k)) if k == "bogus"
        ));
    }

    #[test]
    fn test_defaults_filled() {
        let d = Desc::from(
            StructDesc::builder()
                .field("a", Desc::from(IntDesc::u8()))
                .field("s", Desc::from(StrDesc::fixed(2)))
                .build()
                .unwrap(),
        );
        let v: ValueMap = [("a", Value::Int(7))].into_iter().collect();
        let out = validate(&d, &Value::Map(v)).unwrap();
        let m = out.as_map().unwrap();
        assert_eq!(m.get_int("a"), Some(7));
        assert_eq!(m.get_bytes("s"), Some(&b""[..]));
    }

    #[test]
    fn test_nested_range_check() {
        let d = Desc::from(
            StructDesc::builder()
                .field("a", Desc::from(IntDesc::u8()))
                .build()
                .unwrap(),
        );
        let v: ValueMap = [("a", Value::Int(300))].into_iter().collect();
        assert!(matches!(
            validate(&d, &Value::Map(v)),
            Err(CodecError::Constraint(_))
        ));
    }

    #[test]
    fn test_bitfield_unknown_field_and_range() {
        let d = Desc::from(
            BitfieldDesc::builder()
                .unsigned("a", 2)
                .signed("b", 3)
                .build()
                .unwrap(),
        );
        let v: ValueMap = [("zzz", Value::Int(0))].into_iter().collect();
        assert!(matches!(
            validate(&d, &Value::Map(v)),
            Err(CodecError::UnknownField(_))
        ));

        let v: ValueMap = [("a", Value::Int(4))].into_iter().collect();
        assert!(matches!(
            validate(&d, &Value::Map(v)),
            Err(CodecError::Constraint(_))
        ));

        let v: ValueMap = [("b", Value::Int(-4))].into_iter().collect();
        let out = validate(&d, &Value::Map(v)).unwrap();
        assert_eq!(out.as_map().unwrap().get_int("a"), Some(0));
    }

    #[test]
    fn test_validation_can_be_disabled() {
        use crate::desc::PackOpts;
        let d = Desc::from(
            StructDesc::builder()
                .field("a", Desc::from(IntDesc::u8()))
                .build()
                .unwrap(),
        );
        // an unknown key slips through when validation is off; it simply
        // never gets emitted
        let v: ValueMap = [("a", Value::Int(1)), ("zzz", Value::Int(9))]
            .into_iter()
            .collect();
        let bytes = d
            .pack_with(&Value::Map(v), PackOpts::new().validate(false))
            .unwrap();
        assert_eq!(bytes, vec![1]);
    }
}
