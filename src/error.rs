// Error taxonomy shared by every descriptor and the pack/unpack engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    /// Value out of range, unknown symbol in strict mode, oversize string,
    /// or a schema shape mismatch.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Struct pack map carried a key no field declares.
    #[error("Unknown key: {0}")]
    UnknownKey(String),

    /// Union accessor or pack map named an undeclared member.
    #[error("Unknown member: {0}")]
    UnknownMember(String),

    /// Bitfield accessor or pack map named an undeclared sub-field.
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// A decoder ran short on input; `need` is how many more bytes it wanted.
    #[error("Missing bytes: need {need} more")]
    MissingBytes { need: usize },

    #[error("Terminator not found")]
    TerminatorNotFound,

    /// Union pack map selected more than one member.
    #[error("Conflicting members: {0} and {1}")]
    ConflictingMembers(String, String),

    /// Operation not available for this descriptor, e.g. `read` on a
    /// variable-size type or a write to a frozen union.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Illegal layout detected at construction time.
    #[error("Layout error: {0}")]
    Build(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;

impl CodecError {
    pub fn is_missing_bytes(&self) -> bool {
        matches!(self, CodecError::MissingBytes { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = CodecError::MissingBytes { need: 3 };
        assert_eq!(err.to_string(), "Missing bytes: need 3 more");
        assert!(err.is_missing_bytes());

        let err = CodecError::ConflictingMembers("a".into(), "b".into());
        assert_eq!(err.to_string(), "Conflicting members: a and b");
    }
}
