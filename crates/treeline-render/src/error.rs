//! Error types for document loading.
//!
//! Rendering itself never fails: bad values render as the
//! [`SENTINEL`](crate::SENTINEL) marker and structural misses render as empty
//! text. The only hard failures happen while a document snapshot and its
//! format table are loaded, and those are reported through [`Error`].

use std::io;

/// Errors that can occur while loading a document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to read the document from disk.
    #[error("failed to read document: {0}")]
    Io(#[from] io::Error),

    /// The document is not valid JSON or does not match the snapshot schema.
    ///
    /// Unknown field type names end up here, since the field type set is
    /// closed and checked during deserialization.
    #[error("failed to parse document: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two nodes share the same id.
    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    /// A node lists a child id that no node carries.
    #[error("node '{parent}' references unknown child '{child}'")]
    UnknownChild { parent: String, child: String },

    /// A root id in `properties.topnodes` does not resolve to a node.
    #[error("unknown root node '{0}'")]
    UnknownRoot(String),

    /// A node uses a format name missing from the format table.
    #[error("node '{node}' uses unknown format '{format}'")]
    UnknownFormat { node: String, format: String },

    /// A regular-expression field carries a pattern that does not compile.
    #[error("invalid pattern for field '{field}' in format '{format}': {source}")]
    InvalidPattern {
        format: String,
        field: String,
        #[source]
        source: regex::Error,
    },
}

impl Error {
    /// Create an unknown-child error.
    pub fn unknown_child(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self::UnknownChild {
            parent: parent.into(),
            child: child.into(),
        }
    }

    /// Create an unknown-format error.
    pub fn unknown_format(node: impl Into<String>, format: impl Into<String>) -> Self {
        Self::UnknownFormat {
            node: node.into(),
            format: format.into(),
        }
    }
}

/// Result type for document loading.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::unknown_child("root", "ghost");
        assert_eq!(
            err.to_string(),
            "node 'root' references unknown child 'ghost'"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_invalid_pattern_has_source() {
        use std::error::Error as _;

        let regex_err = regex::Regex::new("(").unwrap_err();
        let err = Error::InvalidPattern {
            format: "Task".into(),
            field: "Code".into(),
            source: regex_err,
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("'Code'"));
    }
}
