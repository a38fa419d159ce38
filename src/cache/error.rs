//! Ordered cache error types

use std::fmt;
use tonic::Code;

/// Errors that can occur within the ordered cache and its remote facade.
///
/// "Not found" is never an error: lookups report it as `Ok(None)` and
/// updates as `Ok(false)`. Every variant here means the operation itself
/// could not be carried out.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CacheError {
    /// The identifier generator could not produce a next identifier.
    /// No entry was created and no identifier was consumed.
    IdGenerationFailed,

    /// The identifier generator produced a value that does not exceed the
    /// previously issued identifier.
    NonMonotonicId {
        /// The previously issued identifier
        previous: String,
        /// The rejected identifier
        generated: String,
    },

    /// The writer lock was poisoned by a panicking writer.
    LockPoisoned,

    /// The configuration was rejected at setup time.
    InvalidConfiguration {
        /// Description of the error
        message: String,
    },

    /// A value could not be encoded or decoded by the configured codec.
    Serialization {
        /// Underlying error message
        message: String,
    },

    /// The transport failed (connection refused or lost, stream closed
    /// early).
    Transport {
        /// Underlying error message
        message: String,
    },

    /// The server answered with an explicit fault status.
    Fault {
        /// gRPC status code reported by the server
        code: Code,
        /// Status message reported by the server
        message: String,
    },

    /// The server reported that a write operation did not succeed.
    Rejected {
        /// Name of the rejected operation
        operation: &'static str,
    },

    /// The server answered with a reply that does not match the request.
    UnexpectedResponse {
        /// Name of the operation that received the reply
        operation: &'static str,
    },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::IdGenerationFailed => write!(f, "identifier generation failed"),
            CacheError::NonMonotonicId {
                previous,
                generated,
            } => {
                write!(
                    f,
                    "non-monotonic identifier: generated {generated} does not exceed {previous}"
                )
            }
            CacheError::LockPoisoned => write!(f, "cache writer lock poisoned"),
            CacheError::InvalidConfiguration { message } => {
                write!(f, "invalid cache configuration: {message}")
            }
            CacheError::Serialization { message } => {
                write!(f, "value serialization error: {message}")
            }
            CacheError::Transport { message } => write!(f, "transport error: {message}"),
            CacheError::Fault { code, message } => {
                write!(f, "server fault ({code:?}): {message}")
            }
            CacheError::Rejected { operation } => {
                write!(f, "remote {operation} was rejected by the server")
            }
            CacheError::UnexpectedResponse { operation } => {
                write!(f, "unexpected reply to remote {operation}")
            }
        }
    }
}

impl std::error::Error for CacheError {}
