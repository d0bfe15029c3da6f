//! # Error Types
//!
//! Structured error types for frame_core. Every variant names the record that
//! caused it (section and line, story, point, member) so a failed build can be
//! traced straight back to the input.
//!
//! Errors fall into two groups:
//!
//! - **Fatal** errors abort the pipeline: [`ModelError::ParseError`],
//!   [`ModelError::UndefinedReference`], [`ModelError::OrderingViolation`],
//!   [`ModelError::TagCollision`] and the I/O variants.
//! - **Per-item** errors are recorded in the artifact set and the build
//!   carries on: [`ModelError::UnresolvedReference`],
//!   [`ModelError::DegenerateGeometry`] and [`ModelError::ConstraintConflict`].
//!
//! ## Example
//!
//! ```rust
//! use frame_core::errors::{ModelError, ModelResult};
//!
//! fn require_height(story: &str, height: Option<f64>) -> ModelResult<f64> {
//!     height.ok_or_else(|| ModelError::parse("STORIES", 3, format!("story '{story}' has no HEIGHT")))
//! }
//!
//! let err = require_height("L2", None).unwrap_err();
//! assert!(err.is_fatal());
//! assert_eq!(err.error_code(), "PARSE_ERROR");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for frame_core operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Structured error type for model translation.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum ModelError {
    /// A record inside a known section is malformed or misses a mandatory field
    #[error("Parse error in section '{section}' at line {line}: {reason}")]
    ParseError {
        section: String,
        line: usize,
        reason: String,
    },

    /// An assignment names a story, point, line, spring or diaphragm that was never declared
    #[error("Undefined {kind} '{name}' referenced by {context}")]
    UndefinedReference {
        kind: String,
        name: String,
        context: String,
    },

    /// A member endpoint has no resolvable coordinate on the story it needs
    #[error("Unresolved point '{point}' on story '{story}' for {subject}: {reason}")]
    UnresolvedReference {
        subject: String,
        point: String,
        story: String,
        reason: String,
    },

    /// An element was emitted before one of its nodes was registered
    #[error("Ordering violation: element {element} references node {node} before it exists")]
    OrderingViolation { element: u64, node: u64 },

    /// Two different nodes were registered under the same tag
    #[error("Tag collision on {tag}: existing {existing}, incoming {incoming}")]
    TagCollision {
        tag: u64,
        existing: String,
        incoming: String,
    },

    /// A member is too short to define an orientation
    #[error("Degenerate geometry for {subject} on story '{story}': length {length:e} - {reason}")]
    DegenerateGeometry {
        subject: String,
        story: String,
        length: f64,
        reason: String,
    },

    /// A constraint was dropped because another constraint takes precedence
    #[error("Constraint conflict on story '{story}': {reason}")]
    ConstraintConflict { story: String, reason: String },

    /// Critical validation findings prevent handing the model to the runtime
    #[error("Execution blocked by {critical} critical validation finding(s)")]
    ExecutionBlocked { critical: usize },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Artifact schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl ModelError {
    /// Create a ParseError
    pub fn parse(section: impl Into<String>, line: usize, reason: impl Into<String>) -> Self {
        ModelError::ParseError {
            section: section.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Create an UndefinedReference error
    pub fn undefined(kind: impl Into<String>, name: impl Into<String>, context: impl Into<String>) -> Self {
        ModelError::UndefinedReference {
            kind: kind.into(),
            name: name.into(),
            context: context.into(),
        }
    }

    /// Create an UnresolvedReference error
    pub fn unresolved(
        subject: impl Into<String>,
        point: impl Into<String>,
        story: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ModelError::UnresolvedReference {
            subject: subject.into(),
            point: point.into(),
            story: story.into(),
            reason: reason.into(),
        }
    }

    /// Create a DegenerateGeometry error
    pub fn degenerate(
        subject: impl Into<String>,
        story: impl Into<String>,
        length: f64,
        reason: impl Into<String>,
    ) -> Self {
        ModelError::DegenerateGeometry {
            subject: subject.into(),
            story: story.into(),
            length,
            reason: reason.into(),
        }
    }

    /// Create a ConstraintConflict
    pub fn conflict(story: impl Into<String>, reason: impl Into<String>) -> Self {
        ModelError::ConstraintConflict {
            story: story.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        ModelError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error aborts the pipeline.
    ///
    /// Unresolved references, degenerate members and constraint conflicts are
    /// recorded against a single item instead.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ModelError::UnresolvedReference { .. }
                | ModelError::DegenerateGeometry { .. }
                | ModelError::ConstraintConflict { .. }
        )
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ModelError::ParseError { .. } => "PARSE_ERROR",
            ModelError::UndefinedReference { .. } => "UNDEFINED_REFERENCE",
            ModelError::UnresolvedReference { .. } => "UNRESOLVED_REFERENCE",
            ModelError::OrderingViolation { .. } => "ORDERING_VIOLATION",
            ModelError::TagCollision { .. } => "TAG_COLLISION",
            ModelError::DegenerateGeometry { .. } => "DEGENERATE_GEOMETRY",
            ModelError::ConstraintConflict { .. } => "CONSTRAINT_CONFLICT",
            ModelError::ExecutionBlocked { .. } => "EXECUTION_BLOCKED",
            ModelError::FileError { .. } => "FILE_ERROR",
            ModelError::SerializationError { .. } => "SERIALIZATION_ERROR",
            ModelError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(e: serde_json::Error) -> Self {
        ModelError::SerializationError { reason: e.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = ModelError::parse("POINT COORDINATES", 12, "expected X coordinate");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"ParseError\""));
        let roundtrip: ModelError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_fatality() {
        assert!(ModelError::OrderingViolation { element: 1, node: 2 }.is_fatal());
        assert!(ModelError::undefined("story", "L9", "LINEASSIGN \"B1\"").is_fatal());
        assert!(!ModelError::unresolved("B1", "60", "S1", "no elevation").is_fatal());
        assert!(!ModelError::degenerate("C3", "L2", 0.0, "zero length").is_fatal());
        assert!(!ModelError::conflict("Base", "story has supports").is_fatal());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ModelError::conflict("L1", "x").error_code(), "CONSTRAINT_CONFLICT");
        assert_eq!(
            ModelError::TagCollision { tag: 1, existing: "a".into(), incoming: "b".into() }.error_code(),
            "TAG_COLLISION"
        );
    }

    #[test]
    fn test_display_names_record() {
        let error = ModelError::unresolved("line 'B7'", "60", "S1", "story elevation unknown");
        let text = error.to_string();
        assert!(text.contains("'60'"));
        assert!(text.contains("'S1'"));
    }
}
