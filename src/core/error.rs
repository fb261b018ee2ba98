// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Core error types for cdrkey.
//!
//! The variants follow the failure classes of the codec:
//! - Bounds violations while writing bounded members
//! - Unresolved type references discovered at first use
//! - Declarations the builder cannot turn into a codec tree
//! - Union discriminator problems
//! - Decode mismatches (truncated or malformed input)

use thiserror::Error;

/// Errors that can occur while building or running CDR codecs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// A string, bytes, sequence or map value exceeds its declared bound.
    #[error("Bounds violation in '{member}': length {length} exceeds bound {bound}")]
    BoundsViolation {
        /// Member (or shape) that overflowed
        member: String,
        /// Actual length of the value
        length: usize,
        /// Declared bound
        bound: usize,
    },

    /// The type (or something it references) was never registered.
    #[error("Unresolved dependency for '{type_name}': missing {}", .missing.join(", "))]
    UnresolvedDependency {
        /// Type that was used
        type_name: String,
        /// Every name that is still not registered
        missing: Vec<String>,
    },

    /// The builder cannot produce a codec tree for a declared shape.
    #[error("Unencodable shape in '{type_name}': {reason}")]
    UnencodableShape {
        /// Declared type being built
        type_name: String,
        /// What was wrong with the shape
        reason: String,
    },

    /// No sentinel discriminator is left for the default case.
    #[error("Union '{type_name}' has no discriminator value left for its default case")]
    UnionDomainExhausted {
        /// Union type name
        type_name: String,
    },

    /// A union value names a label that is neither a case nor encodable.
    #[error("Invalid discriminator {label} for union '{type_name}'")]
    InvalidDiscriminator {
        /// Union type name
        type_name: String,
        /// Offending label
        label: i64,
    },

    /// Buffer too short for requested read
    #[error("Buffer too short: requested {requested} bytes at position {cursor_pos}, but only {available} bytes available")]
    BufferTooShort {
        /// Requested bytes
        requested: usize,
        /// Available bytes
        available: usize,
        /// Cursor position when error occurred
        cursor_pos: u64,
    },

    /// Bytes decoded cleanly but do not form a valid value.
    #[error("Invalid data in {context}: {message}")]
    InvalidData {
        /// What was being decoded
        context: String,
        /// Error message
        message: String,
    },

    /// A value does not fit the shape it is written as.
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected shape
        expected: String,
        /// Value actually supplied
        found: String,
    },

    /// A struct value lacks one of its declared members.
    #[error("Struct '{type_name}' is missing member '{member}'")]
    MissingMember {
        /// Struct type name
        type_name: String,
        /// Member name
        member: String,
    },

    /// Field encode error with context
    #[error("Failed to encode field '{field_path}': {cause}")]
    FieldEncodeError {
        /// Dotted path of the member
        field_path: String,
        /// Underlying error
        cause: Box<CodecError>,
    },

    /// Invalid declared type
    #[error("Invalid schema '{schema_name}': {reason}")]
    InvalidSchema {
        /// Schema name or identifier
        schema_name: String,
        /// Validation error message
        reason: String,
    },

    /// Type not found in registry
    #[error("Type not found: '{type_name}'")]
    TypeNotFound {
        /// Type name that was not found
        type_name: String,
    },

    /// Configuration could not be loaded
    #[error("Config error: {0}")]
    Config(String),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

impl CodecError {
    /// Create a bounds violation error.
    pub fn bounds(member: impl Into<String>, length: usize, bound: usize) -> Self {
        CodecError::BoundsViolation {
            member: member.into(),
            length,
            bound,
        }
    }

    /// Create an unresolved dependency error.
    pub fn unresolved(type_name: impl Into<String>, missing: Vec<String>) -> Self {
        CodecError::UnresolvedDependency {
            type_name: type_name.into(),
            missing,
        }
    }

    /// Create an unencodable shape error.
    pub fn unencodable(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        CodecError::UnencodableShape {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid schema error.
    pub fn invalid_schema(schema_name: impl Into<String>, reason: impl Into<String>) -> Self {
        CodecError::InvalidSchema {
            schema_name: schema_name.into(),
            reason: reason.into(),
        }
    }

    /// Create a "type not found" error.
    pub fn type_not_found(type_name: impl Into<String>) -> Self {
        CodecError::TypeNotFound {
            type_name: type_name.into(),
        }
    }

    /// Create a buffer too short error.
    pub fn buffer_too_short(requested: usize, available: usize, cursor_pos: u64) -> Self {
        CodecError::BufferTooShort {
            requested,
            available,
            cursor_pos,
        }
    }

    /// Create an invalid data error.
    pub fn invalid_data(context: impl Into<String>, message: impl Into<String>) -> Self {
        CodecError::InvalidData {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        CodecError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Wrap an error with the member path it occurred in.
    ///
    /// Nested wraps are collapsed so the path reads `outer.inner`.
    pub fn in_field(self, field: &str) -> Self {
        match self {
            CodecError::FieldEncodeError { field_path, cause } => CodecError::FieldEncodeError {
                field_path: format!("{field}.{field_path}"),
                cause,
            },
            other => CodecError::FieldEncodeError {
                field_path: field.to_string(),
                cause: Box::new(other),
            },
        }
    }

    /// The innermost error, skipping member path wrappers.
    pub fn root_cause(&self) -> &CodecError {
        match self {
            CodecError::FieldEncodeError { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    /// Whether this error means the input bytes could not be decoded.
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self.root_cause(),
            CodecError::BufferTooShort { .. } | CodecError::InvalidData { .. }
        )
    }

    /// Get structured fields for logging.
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        match self {
            CodecError::BoundsViolation {
                member,
                length,
                bound,
            } => vec![
                ("member", member.clone()),
                ("length", length.to_string()),
                ("bound", bound.to_string()),
            ],
            CodecError::UnresolvedDependency { type_name, missing } => vec![
                ("type", type_name.clone()),
                ("missing", missing.join(",")),
            ],
            CodecError::UnencodableShape { type_name, reason } => {
                vec![("type", type_name.clone()), ("reason", reason.clone())]
            }
            CodecError::UnionDomainExhausted { type_name } => vec![("type", type_name.clone())],
            CodecError::InvalidDiscriminator { type_name, label } => {
                vec![("type", type_name.clone()), ("label", label.to_string())]
            }
            CodecError::BufferTooShort {
                requested,
                available,
                cursor_pos,
            } => vec![
                ("requested", requested.to_string()),
                ("available", available.to_string()),
                ("cursor", cursor_pos.to_string()),
            ],
            CodecError::InvalidData { context, message } => {
                vec![("context", context.clone()), ("message", message.clone())]
            }
            CodecError::TypeMismatch { expected, found } => {
                vec![("expected", expected.clone()), ("found", found.clone())]
            }
            CodecError::MissingMember { type_name, member } => {
                vec![("type", type_name.clone()), ("member", member.clone())]
            }
            CodecError::FieldEncodeError { field_path, cause } => {
                vec![("field", field_path.clone()), ("cause", cause.to_string())]
            }
            CodecError::InvalidSchema {
                schema_name,
                reason,
            } => vec![("schema", schema_name.clone()), ("reason", reason.clone())],
            CodecError::TypeNotFound { type_name } => vec![("type", type_name.clone())],
            CodecError::Config(msg) => vec![("config", msg.clone())],
            CodecError::Other(msg) => vec![("message", msg.clone())],
        }
    }
}

impl From<toml::de::Error> for CodecError {
    fn from(err: toml::de::Error) -> Self {
        CodecError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::invalid_schema("json", err.to_string())
    }
}

/// Result type for cdrkey operations.
pub type Result<T> = std::result::Result<T, CodecError>;
