// Byte order handling: host detection and the process-wide default

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Byte order for multi-byte values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endian {
    Big,
    Little,
}

impl Endian {
    pub fn is_big(&self) -> bool {
        matches!(self, Endian::Big)
    }

    pub fn is_little(&self) -> bool {
        matches!(self, Endian::Little)
    }
}

/// Detect the host byte order by probing the native representation of a
/// known 16-bit word.
pub fn host_endian() -> Endian {
    if 0x0001u16.to_ne_bytes()[0] == 0x01 {
        Endian::Little
    } else {
        Endian::Big
    }
}

// 0 = big, 1 = little, 2 = unset (falls back to host)
static DEFAULT_ENDIAN: AtomicU8 = AtomicU8::new(2);

/// The process-wide default endian, used when neither the descriptor nor
/// the caller supplies one. Starts out as the host endian.
pub fn default_endian() -> Endian {
    match DEFAULT_ENDIAN.load(Ordering::Relaxed) {
        0 => Endian::Big,
        1 => Endian::Little,
        _ => host_endian(),
    }
}

/// Replace the process-wide default endian.
pub fn set_default_endian(endian: Endian) {
    let raw = match endian {
        Endian::Big => 0,
        Endian::Little => 1,
    };
    DEFAULT_ENDIAN.store(raw, Ordering::Relaxed);
}

/// Resolve the effective endian for one encode/decode call:
/// descriptor's fixed endian, else the caller's, else the process default.
pub(crate) fn effective(fixed: Option<Endian>, caller: Option<Endian>) -> Endian {
    fixed.or(caller).unwrap_or_else(default_endian)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_matches_target() {
        let expected = if cfg!(target_endian = "little") {
            Endian::Little
        } else {
            Endian::Big
        };
        assert_eq!(host_endian(), expected);
    }

    #[test]
    fn test_effective_resolution() {
        assert_eq!(effective(Some(Endian::Big), Some(Endian::Little)), Endian::Big);
        assert_eq!(effective(None, Some(Endian::Little)), Endian::Little);
        assert_eq!(effective(None, None), default_endian());
    }

    #[test]
    fn test_predicates() {
        assert!(Endian::Big.is_big());
        assert!(Endian::Little.is_little());
        assert!(!Endian::Little.is_big());
    }
}
