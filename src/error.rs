//! Error types for the Nexus code generator

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the generator
///
/// Pipeline errors (everything except [`Error::Decode`] and [`Error::Io`]) are
/// scoped to a single input file: the driver attaches them to that file and
/// keeps generating the others.
#[derive(Error, Debug)]
pub enum Error {
    /// The descriptor tree is missing a required field
    #[error("malformed descriptor: {0}")]
    MalformedDescriptor(String),

    /// A client- or server-streaming method was found
    #[error(
        "unsupported method kind: {method} is {kind}; Nexus operations take exactly one input and one output message"
    )]
    UnsupportedMethodKind { method: String, kind: &'static str },

    /// Two operations of one service share a runtime operation name
    #[error("duplicate operation name {name:?} in service {service}: used by {first} and {second}")]
    DuplicateOperationName {
        service: String,
        name: String,
        first: String,
        second: String,
    },

    /// Two definitions derive the same Go identifier
    #[error("identifier collision: {identifier} is derived from both {first} and {second}")]
    IdentifierCollision {
        identifier: String,
        first: String,
        second: String,
    },

    /// A message type is not present anywhere in the descriptor set
    #[error("unresolvable type {type_name} referenced by {referrer}")]
    UnresolvableType { type_name: String, referrer: String },

    /// The parameter string contains an unrecognized key
    #[error("unknown option {0:?}")]
    UnknownOption(String),

    /// A recognized option has an unusable value
    #[error("invalid value for option {key:?}: {reason}")]
    InvalidOption { key: String, reason: String },

    /// The plugin request could not be decoded
    #[error("decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable machine-readable code, used as a structured field in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Error::MalformedDescriptor(_) => "MALFORMED_DESCRIPTOR",
            Error::UnsupportedMethodKind { .. } => "UNSUPPORTED_METHOD_KIND",
            Error::DuplicateOperationName { .. } => "DUPLICATE_OPERATION_NAME",
            Error::IdentifierCollision { .. } => "IDENTIFIER_COLLISION",
            Error::UnresolvableType { .. } => "UNRESOLVABLE_TYPE",
            Error::UnknownOption(_) => "UNKNOWN_OPTION",
            Error::InvalidOption { .. } => "INVALID_OPTION",
            Error::Decode(_) => "DECODE_ERROR",
            Error::Io(_) => "IO_ERROR",
        }
    }

    /// Whether the error ends the whole invocation rather than a single file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Decode(_) | Error::Io(_))
    }

    pub(crate) fn invalid_option(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidOption {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
