// Builder-time lookup of named types, threaded explicitly through
// construction code instead of living in ambient global state

use crate::desc::{Desc, IntDesc};
use std::collections::HashMap;

/// Name -> descriptor lookup used while building layouts.
///
/// Lookups search scope frames innermost-first; `scope` pushes a frame for
/// the duration of a closure and pops it on every exit path.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    frames: Vec<HashMap<String, Desc>>,
}

impl Default for TypeRegistry {
    fn default() -> TypeRegistry {
        TypeRegistry::new()
    }
}

impl TypeRegistry {
    /// A registry seeded with the fundamental integer names.
    pub fn new() -> TypeRegistry {
        let mut base = HashMap::new();
        let fundamentals: [(&str, IntDesc); 16] = [
            ("u8", IntDesc::u8()),
            ("u16", IntDesc::u16()),
            ("u32", IntDesc::u32()),
            ("u64", IntDesc::u64()),
            ("i8", IntDesc::i8()),
            ("i16", IntDesc::i16()),
            ("i32", IntDesc::i32()),
            ("i64", IntDesc::i64()),
            ("uint8_t", IntDesc::u8()),
            ("uint16_t", IntDesc::u16()),
            ("uint32_t", IntDesc::u32()),
            ("uint64_t", IntDesc::u64()),
            ("int8_t", IntDesc::i8()),
            ("int16_t", IntDesc::i16()),
            ("int32_t", IntDesc::i32()),
            ("int64_t", IntDesc::i64()),
        ];
        for (name, int) in fundamentals {
            base.insert(name.to_string(), Desc::from(int));
        }
        TypeRegistry { frames: vec![base] }
    }

    /// An empty registry without the fundamental seeds.
    pub fn bare() -> TypeRegistry {
        TypeRegistry {
            frames: vec![HashMap::new()],
        }
    }

    /// Register `desc` in the innermost scope.
    pub fn register(&mut self, name: impl Into<String>, desc: Desc) {
        if self.frames.is_empty() {
            self.frames.push(HashMap::new());
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), desc);
        }
    }

    /// Look `name` up, innermost scope first.
    pub fn lookup(&self, name: &str) -> Option<&Desc> {
        self.frames.iter().rev().find_map(|f| f.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Run `f` with a fresh scope frame; the frame is dropped afterwards,
    /// including on early returns inside `f`.
    pub fn scope<R>(&mut self, f: impl FnOnce(&mut TypeRegistry) -> R) -> R {
        self.frames.push(HashMap::new());
        let out = f(self);
        self.frames.pop();
        out
    }
}
