// GCC-XML / CastXML output ingestion into a CTree
// Flat event parse: every node is one element carrying attributes; only
// enumerations nest (their EnumValue children).

use crate::error::{CodecError, Result};
use crate::import::tree::{CNode, CTree, EnumValueNode};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Reader;

/// Parse a compiler-emitted XML tree into a `CTree`.
///
/// Recognized elements (matched case-insensitively): FundamentalType,
/// Typedef, PointerType, CvQualifiedType, ElaboratedType, ArrayType,
/// Struct, Union, Enumeration/EnumValue, Field. Everything else is
/// ignored, so full compiler dumps can be fed in unfiltered.
pub fn parse_xml(content: &str) -> Result<CTree> {
    let mut reader = Reader::from_str(content);
    let mut tree = CTree::new();

    // open Enumeration element awaiting its EnumValue children
    let mut pending_enum: Option<(String, String, Option<u32>, Vec<EnumValueNode>)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = local_name(e.name());
                if name.eq_ignore_ascii_case("enumeration") {
                    pending_enum = Some((
                        attr(e, "id").unwrap_or_default(),
                        attr(e, "name").unwrap_or_default(),
                        attr_u32(e, "size"),
                        Vec::new(),
                    ));
                } else if name.eq_ignore_ascii_case("enumvalue") {
                    push_enum_value(&mut pending_enum, e);
                } else {
                    handle_element(&mut tree, &name, e)?;
                }
            }
            Ok(Event::Empty(ref e)) => {
                let name = local_name(e.name());
                if name.eq_ignore_ascii_case("enumvalue") {
                    push_enum_value(&mut pending_enum, e);
                } else {
                    handle_element(&mut tree, &name, e)?;
                }
            }
            Ok(Event::End(ref e)) => {
                if local_name(e.name()).eq_ignore_ascii_case("enumeration") {
                    if let Some((id, name, size, values)) = pending_enum.take() {
                        tree.insert(id, CNode::Enumeration { name, size, values });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(CodecError::Build(format!("XML parse error: {e}")));
            }
            _ => {}
        }
    }

    Ok(tree)
}

fn push_enum_value(
    pending: &mut Option<(String, String, Option<u32>, Vec<EnumValueNode>)>,
    e: &BytesStart,
) {
    if let Some((_, _, _, values)) = pending {
        values.push(EnumValueNode {
            name: attr(e, "name").unwrap_or_default(),
            init: attr(e, "init").and_then(|v| v.parse().ok()).unwrap_or(0),
        });
    }
}

fn handle_element(tree: &mut CTree, name: &str, e: &BytesStart) -> Result<()> {
    let node = if name.eq_ignore_ascii_case("fundamentaltype") {
        Some(CNode::FundamentalType {
            name: attr(e, "name").unwrap_or_default(),
            size: attr_u32(e, "size").unwrap_or(0),
        })
    } else if name.eq_ignore_ascii_case("typedef") {
        Some(CNode::Typedef {
            name: attr(e, "name").unwrap_or_default(),
            ty: attr(e, "type").unwrap_or_default(),
        })
    } else if name.eq_ignore_ascii_case("pointertype") {
        Some(CNode::PointerType {
            size: attr_u32(e, "size"),
        })
    } else if name.eq_ignore_ascii_case("cvqualifiedtype") {
        Some(CNode::CvQualifiedType {
            ty: attr(e, "type").unwrap_or_default(),
        })
    } else if name.eq_ignore_ascii_case("elaboratedtype") {
        Some(CNode::ElaboratedType {
            ty: attr(e, "type").unwrap_or_default(),
        })
    } else if name.eq_ignore_ascii_case("arraytype") {
        Some(CNode::ArrayType {
            ty: attr(e, "type").unwrap_or_default(),
            count: array_count(e),
        })
    } else if name.eq_ignore_ascii_case("struct") {
        Some(CNode::Struct {
            name: attr(e, "name").unwrap_or_default(),
            members: id_list(&attr(e, "members").unwrap_or_default()),
        })
    } else if name.eq_ignore_ascii_case("union") {
        Some(CNode::Union {
            name: attr(e, "name").unwrap_or_default(),
            members: id_list(&attr(e, "members").unwrap_or_default()),
        })
    } else if name.eq_ignore_ascii_case("field") {
        Some(CNode::Field {
            name: attr(e, "name").unwrap_or_default(),
            ty: attr(e, "type").unwrap_or_default(),
            offset: attr(e, "offset").and_then(|v| v.parse().ok()),
        })
    } else {
        None
    };

    if let Some(node) = node {
        let id = attr(e, "id").ok_or_else(|| {
            CodecError::Build(format!("element {name} has no id attribute"))
        })?;
        tree.insert(id, node);
    }
    Ok(())
}

fn local_name(name: QName) -> String {
    String::from_utf8_lossy(name.as_ref()).to_string()
}

/// Attribute value by (case-insensitive) name.
fn attr(e: &BytesStart, name: &str) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        let key = String::from_utf8_lossy(a.key.as_ref()).to_string();
        if key.eq_ignore_ascii_case(name) {
            Some(String::from_utf8_lossy(&a.value).to_string())
        } else {
            None
        }
    })
}

fn attr_u32(e: &BytesStart, name: &str) -> Option<u32> {
    attr(e, name).and_then(|v| v.parse().ok())
}

/// Element count of an array node: `max - min + 1`, tolerating the `u`
/// suffix some emitters put on `max`.
fn array_count(e: &BytesStart) -> usize {
    let digits = |v: String| -> Option<usize> {
        let trimmed: String = v.chars().take_while(|c| c.is_ascii_digit()).collect();
        trimmed.parse().ok()
    };
    let max = attr(e, "max").and_then(digits);
    let min = attr(e, "min").and_then(digits).unwrap_or(0);
    match max {
        Some(max) if max >= min => max - min + 1,
        _ => 0,
    }
}

fn id_list(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endian::Endian;
    use crate::value::{Value, ValueMap};

    const HEADER_XML: &str = r#"<?xml version="1.0"?>
<GCC_XML>
  <FundamentalType id="_1" name="unsigned char" size="8"/>
  <FundamentalType id="_2" name="unsigned int" size="32"/>
  <FundamentalType id="_3" name="char" size="8"/>
  <Typedef id="_4" name="u8" type="_1"/>
  <ArrayType id="_5" min="0" max="7u" type="_3"/>
  <Field id="_f1" name="version" type="_4" offset="0"/>
  <Field id="_f2" name="serial" type="_2" offset="32"/>
  <Field id="_f3" name="label" type="_5" offset="64"/>
  <Struct id="_s1" name="ident" members="_f1 _f2 _f3"/>
  <Enumeration id="_e1" name="mode" size="8">
    <EnumValue name="off" init="0"/>
    <EnumValue name="on" init="1"/>
    <EnumValue name="auto" init="4"/>
  </Enumeration>
</GCC_XML>"#;

    #[test]
    fn test_parse_and_resolve_struct() {
        let tree = parse_xml(HEADER_XML).unwrap();
        let d = tree.resolve_named("ident").unwrap();
        // version u8, 3-byte pad, serial u32, 8-byte char array
        assert_eq!(d.size(), 16);

        let v: ValueMap = [
            ("version", Value::Int(2)),
            ("serial", Value::Int(0x01020304)),
            ("label", Value::from("uv5r")),
        ]
        .into_iter()
        .collect();
        let bytes = d.with_endian(Endian::Big).pack(&Value::Map(v)).unwrap();
        assert_eq!(
            bytes,
            vec![
                2, 0, 0, 0, 1, 2, 3, 4, b'u', b'v', b'5', b'r', 0, 0, 0, 0
            ]
        );

        // the char array keeps its NULs when decoded
        let decoded = d.with_endian(Endian::Big).unpack(&bytes).unwrap();
        assert_eq!(
            decoded.as_map().unwrap().get_bytes("label"),
            Some(&b"uv5r\0\0\0\0"[..])
        );
    }

    #[test]
    fn test_parse_enum() {
        let tree = parse_xml(HEADER_XML).unwrap();
        let d = tree.resolve_named("mode").unwrap();
        assert_eq!(d.size(), 1);
        assert_eq!(d.pack(&Value::sym("auto")).unwrap(), vec![4]);
        assert_eq!(d.unpack(&[1]).unwrap(), Value::sym("on"));
    }

    #[test]
    fn test_unknown_elements_ignored() {
        let xml = r#"<GCC_XML>
  <Namespace id="_n" name="::"/>
  <Function id="_fn" name="main"/>
  <FundamentalType id="_1" name="unsigned char" size="8"/>
</GCC_XML>"#;
        let tree = parse_xml(xml).unwrap();
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_malformed_xml() {
        assert!(parse_xml("<GCC_XML><Struct id=").is_err());
    }
}
