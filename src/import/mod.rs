// C-header importer: compiler-emitted type trees mapped onto descriptors

pub mod tree;
pub mod xml;

pub use tree::{CNode, CTree, EnumValueNode};
pub use xml::parse_xml;
