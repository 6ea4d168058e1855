// CSTRUCT-RS: C-style binary layout descriptors with pack/unpack
// Copyright 2025 - Licensed under GPLv3

pub mod bytebuf;
pub mod desc;
pub mod endian;
pub mod error;
pub mod import;
pub mod registry;
pub mod schema;
pub mod value;

// Re-export commonly used types
pub use bytebuf::ByteBuf;
pub use desc::{
    ArrayDesc, BitfieldDesc, BitmapDesc, Desc, EnumDesc, IntDesc, PackOpts, PadDesc, StrDesc,
    StructDesc, TerminatedDesc, UnionDesc, UnionValue,
};
pub use endian::{default_endian, host_endian, set_default_endian, Endian};
pub use error::{CodecError, Result};
pub use registry::TypeRegistry;
pub use value::{Value, ValueMap};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_public_surface_round_trip() {
        let d = Desc::from(IntDesc::u16()).with_endian(Endian::Big);
        let bytes = d.pack(&Value::Int(0x1234)).unwrap();
        assert_eq!(d.unpack(&bytes).unwrap(), Value::Int(0x1234));
    }
}
