//! Error types for SCIM protocol operations.
//!
//! The error taxonomy mirrors the protocol surface: protocol errors (bad URIs,
//! unparseable filters), schema errors, auth errors, resource errors, and
//! backend faults. Every [`ScimError`] maps to an HTTP status code and to a
//! SCIM `Errors` envelope entry.

use std::time::Duration;

/// Main error type for SCIM operations.
///
/// Covers the full protocol error taxonomy. The HTTP layer obtains the status
/// code via [`ScimError::status`] and renders the error as a SCIM `Errors`
/// envelope; backend faults deliberately carry only a generic description so
/// that directory internals are never leaked to clients.
#[derive(Debug, thiserror::Error)]
pub enum ScimError {
    /// Malformed or unparseable request URI
    #[error("invalid URI: {message}")]
    InvalidUri {
        /// Description of what makes the URI invalid
        message: String,
    },

    /// No resource is registered under the requested endpoint
    #[error("unknown endpoint: {endpoint}")]
    UnknownEndpoint {
        /// The endpoint segment that did not match any resource
        endpoint: String,
    },

    /// Filter expression could not be parsed
    #[error("invalid filter: {message}")]
    InvalidFilter {
        /// Description of the parse failure
        message: String,
    },

    /// Request body could not be parsed as a resource
    #[error("invalid resource: {message}")]
    InvalidResource {
        /// Description of the malformed input
        message: String,
    },

    /// An attribute failed its descriptor constraints
    #[error("schema violation: {0}")]
    Schema(#[from] SchemaViolation),

    /// Missing or bad credentials
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Description of the authentication failure
        message: String,
    },

    /// Authenticated but lacking the privilege for the operation
    #[error("forbidden: {message}")]
    Forbidden {
        /// Description of the missing privilege
        message: String,
    },

    /// Resource does not exist
    #[error("resource not found: {resource} with id '{id}'")]
    NotFound {
        /// The resource type that was requested
        resource: String,
        /// The identifier that did not resolve
        id: String,
    },

    /// Uniqueness violation on create
    #[error("conflict: {message}")]
    Conflict {
        /// Description of the conflicting state
        message: String,
    },

    /// Version mismatch on a conditional update or delete
    #[error("precondition failed: {message}")]
    PreconditionFailed {
        /// Description of the failed precondition
        message: String,
    },

    /// The request deadline elapsed before the exchange completed
    #[error("request expired after {timeout:?}")]
    RequestExpired {
        /// The deadline that was exceeded
        timeout: Duration,
    },

    /// Backend fault (directory down, exhausted retries, protocol error)
    #[error("backend error: {message}")]
    Backend {
        /// Generic description, safe to surface to clients
        message: String,
    },

    /// Operation is recognized but not supported
    #[error("not implemented: {message}")]
    NotImplemented {
        /// The unsupported operation
        message: String,
    },
}

impl ScimError {
    /// The HTTP status code this error maps to.
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidUri { .. }
            | Self::InvalidFilter { .. }
            | Self::InvalidResource { .. }
            | Self::Schema(_) => 400,
            Self::Unauthorized { .. } => 401,
            Self::Forbidden { .. } => 403,
            Self::UnknownEndpoint { .. } | Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::PreconditionFailed { .. } => 412,
            Self::RequestExpired { .. } | Self::Backend { .. } => 500,
            Self::NotImplemented { .. } => 501,
        }
    }

    /// Create an invalid URI error.
    pub fn invalid_uri(message: impl Into<String>) -> Self {
        Self::InvalidUri {
            message: message.into(),
        }
    }

    /// Create an invalid filter error.
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilter {
            message: message.into(),
        }
    }

    /// Create an invalid resource error.
    pub fn invalid_resource(message: impl Into<String>) -> Self {
        Self::InvalidResource {
            message: message.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a backend error with a generic, client-safe description.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Schema constraint violations.
///
/// Raised when a resource or attribute fails the constraints of its
/// descriptor: wrong cardinality, wrong data type, unknown sub-attributes,
/// or more than one `primary` element in a plural value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaViolation {
    /// Required attribute is absent from a POST body
    #[error("required attribute '{attribute}' is missing")]
    MissingRequiredAttribute {
        /// The name of the missing attribute
        attribute: String,
    },

    /// Value does not match the descriptor's data type
    #[error("attribute '{attribute}' has invalid value, expected {expected}, got {actual}")]
    InvalidAttributeValue {
        /// The name of the offending attribute
        attribute: String,
        /// The data type the descriptor declares
        expected: String,
        /// The data type that was provided
        actual: String,
    },

    /// Singular descriptor given zero or multiple values
    #[error("attribute '{attribute}' is singular and takes exactly one value")]
    SingularCardinality {
        /// The name of the singular attribute
        attribute: String,
    },

    /// Plural constructor used with a singular descriptor, or vice versa
    #[error("attribute '{attribute}' has the wrong multiplicity for this constructor")]
    WrongMultiplicity {
        /// The name of the attribute
        attribute: String,
    },

    /// Sub-attribute name not in the parent descriptor's sub-attribute set
    #[error("complex attribute '{attribute}' has unknown sub-attribute '{sub_attribute}'")]
    UnknownSubAttribute {
        /// The name of the complex attribute
        attribute: String,
        /// The unknown sub-attribute name
        sub_attribute: String,
    },

    /// More than one plural element marked `primary`
    #[error("attribute '{attribute}' has more than one primary value")]
    MultiplePrimary {
        /// The name of the plural attribute
        attribute: String,
    },

    /// Attribute name not found in any declared schema (strict mode only)
    #[error("unknown attribute '{attribute}' in schema '{schema}'")]
    UnknownAttribute {
        /// The unresolved attribute name
        attribute: String,
        /// The schema URI it was looked up under
        schema: String,
    },

    /// Schema URI registered twice
    #[error("duplicate schema registration: {uri}")]
    DuplicateSchema {
        /// The schema URI that was already registered
        uri: String,
    },

    /// Resource registered twice under the same name or endpoint
    #[error("duplicate resource registration: {name}")]
    DuplicateResource {
        /// The resource name that was already registered
        name: String,
    },
}

impl SchemaViolation {
    /// Create an invalid value error from a descriptor mismatch.
    pub fn invalid_value(
        attribute: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidAttributeValue {
            attribute: attribute.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a missing required attribute error.
    pub fn missing_required(attribute: impl Into<String>) -> Self {
        Self::MissingRequiredAttribute {
            attribute: attribute.into(),
        }
    }
}

/// Client-side transport failures, classified per the protocol contract.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The exchange was interrupted before completion
    #[error("exchange interrupted: {0}")]
    Interrupted(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The configured deadline elapsed
    #[error("exchange expired after {timeout:?}")]
    Expired {
        /// The deadline that elapsed
        timeout: Duration,
    },

    /// The exchange failed outright
    #[error("exchange failure: {0}")]
    ExchangeFailure(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result alias used throughout the crate.
pub type ScimResult<T> = Result<T, ScimError>;
