//! Mapping between [`CacheError`] and gRPC statuses.
//!
//! The server reports every failed operation as a status so clients can tell
//! a failure from a miss. The client folds statuses back into
//! [`CacheError`]: `Unavailable` is what tonic reports for connection
//! problems, so it becomes [`CacheError::Transport`]; every other code is a
//! server-side [`CacheError::Fault`].

use crate::cache::error::CacheError;
use tonic::{Code, Status};

impl From<CacheError> for Status {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::InvalidConfiguration { message } => Status::failed_precondition(message),
            CacheError::Serialization { message } => Status::invalid_argument(message),
            CacheError::Transport { message } => Status::unavailable(message),
            CacheError::Fault { code, message } => Status::new(code, message),
            CacheError::IdGenerationFailed
            | CacheError::NonMonotonicId { .. }
            | CacheError::LockPoisoned
            | CacheError::Rejected { .. }
            | CacheError::UnexpectedResponse { .. } => Status::internal(err.to_string()),
        }
    }
}

impl From<Status> for CacheError {
    fn from(status: Status) -> Self {
        match status.code() {
            Code::Unavailable => CacheError::Transport {
                message: status.message().to_string(),
            },
            code => CacheError::Fault {
                code,
                message: status.message().to_string(),
            },
        }
    }
}

impl From<tonic::transport::Error> for CacheError {
    fn from(err: tonic::transport::Error) -> Self {
        CacheError::Transport {
            message: err.to_string(),
        }
    }
}
