use std::path::PathBuf;

use thiserror::Error;
use tonic::Status;

fn code_as_i32(code: &tonic::Code) -> i32 {
    *code as i32
}

/// Errors surfaced by the CAS client and the remote-execution driver.
#[derive(Debug, Error)]
pub enum Error {
    /// Local filesystem failure (stat, read, write, mkdir, readlink).
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed server response or unexpected Operation shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A non-OK gRPC status, surfaced after any retries.
    #[error("gRPC error {}: {}", code_as_i32(.code), .message)]
    Rpc { code: tonic::Code, message: String },

    /// All retry attempts were used up; carries the final gRPC status.
    #[error("Retry limit exceeded. Last gRPC error was {}: {}", code_as_i32(.code), .message)]
    RetryLimitExceeded { code: tonic::Code, message: String },

    /// Misused API. These are programmer errors, not recoverable ones.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// SIGINT was observed. Terminal.
    #[error("cancelled")]
    Cancelled,
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// The gRPC status code carried by this error, if any.
    pub fn rpc_code(&self) -> Option<tonic::Code> {
        match self {
            Error::Rpc { code, .. } | Error::RetryLimitExceeded { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        Error::Rpc {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}
