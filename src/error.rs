//! Error handling for livedash.
//!
//! Errors carry a category based on gRPC status codes together with the
//! underlying error. The category decides how the connection manager reacts:
//! * Identity rejections (`InvalidArgument`, `NotFound`, `Unauthenticated`,
//!   `PermissionDenied`) are fatal and stop reconnection
//! * Everything else is considered transient and is retried with backoff
//!
//! # Example
//!
//! ```rust
//! use livedash::error::{Error, ErrorKind, Result};
//!
//! fn lookup(guild_id: &str) -> Result<()> {
//!     if guild_id.is_empty() {
//!         return Err(Error::not_found("no guild id in page path"));
//!     }
//!     Ok(())
//! }
//! ```

#![allow(clippy::enum_glob_use)]

use std::fmt;
use thiserror::Error;

/// Main error type combining error kind and details.
#[derive(Debug)]
pub struct Error {
    /// Classification of the error
    pub kind: ErrorKind,

    /// Details of the underlying error
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

/// Standard result type for livedash operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories based on gRPC status codes.
///
/// See [gRPC status codes](https://github.com/googleapis/googleapis/blob/master/google/rpc/code.proto)
/// for the original definitions.
#[expect(clippy::module_name_repetitions)]
#[derive(Clone, Copy, Debug, Eq, Error, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u32)]
pub enum ErrorKind {
    #[error("operation was cancelled")]
    Cancelled = 1,

    #[error("unknown error")]
    Unknown = 2,

    #[error("invalid argument specified")]
    InvalidArgument = 3,

    #[error("operation timed out")]
    DeadlineExceeded = 4,

    #[error("not found")]
    NotFound = 5,

    #[error("attempt to create what already exists")]
    AlreadyExists = 6,

    #[error("permission denied")]
    PermissionDenied = 7,

    #[error("resource has been exhausted")]
    ResourceExhausted = 8,

    #[error("invalid state")]
    FailedPrecondition = 9,

    #[error("operation aborted")]
    Aborted = 10,

    #[error("out of range")]
    OutOfRange = 11,

    #[error("internal error")]
    Internal = 13,

    #[error("service unavailable")]
    Unavailable = 14,

    #[error("unrecoverable data loss or corruption")]
    DataLoss = 15,

    #[error("no valid authentication credentials")]
    Unauthenticated = 16,
}

macro_rules! constructor {
    ($(#[$doc:meta])* $name:ident => $kind:ident) => {
        $(#[$doc])*
        pub fn $name<E>(error: E) -> Self
        where
            E: Into<Box<dyn std::error::Error + Send + Sync>>,
        {
            Self::new(ErrorKind::$kind, error)
        }
    };
}

impl Error {
    /// Creates a new error with specified kind and details.
    pub fn new<E>(kind: ErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind,
            error: error.into(),
        }
    }

    constructor!(
        /// The connection was torn down mid-operation.
        aborted => Aborted
    );
    constructor!(already_exists => AlreadyExists);
    constructor!(
        /// The operation was cancelled, for example by a shutdown.
        cancelled => Cancelled
    );
    constructor!(data_loss => DataLoss);
    constructor!(
        /// A connect, Hello or identify deadline passed.
        deadline_exceeded => DeadlineExceeded
    );
    constructor!(failed_precondition => FailedPrecondition);
    constructor!(internal => Internal);
    constructor!(
        /// The server rejected the identify payload as incomplete.
        invalid_argument => InvalidArgument
    );
    constructor!(
        /// The requested guild does not exist for the server.
        not_found => NotFound
    );
    constructor!(out_of_range => OutOfRange);
    constructor!(permission_denied => PermissionDenied);
    constructor!(resource_exhausted => ResourceExhausted);
    constructor!(
        /// The identifier is unknown to the server.
        unauthenticated => Unauthenticated
    );
    constructor!(unavailable => Unavailable);
    constructor!(unknown => Unknown);

    /// Returns whether retrying with the same identity is pointless.
    ///
    /// The server rejects an identity with a dedicated close code; a fresh
    /// connection would be rejected again. These are the only fatal kinds.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::InvalidArgument | ErrorKind::NotFound | ErrorKind::Unauthenticated
        )
    }

    /// Attempts to downcast the underlying error to a concrete type.
    #[must_use]
    pub fn downcast<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.error.downcast_ref::<E>()
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}

/// Format: "{kind}: {details}"
impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}: ", self.kind)?;
        self.error.fmt(fmt)
    }
}

/// Converts IO errors into appropriate error kinds.
///
/// Network failures map to transient kinds so that they are retried.
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind::*;
        match err.kind() {
            NotFound => Self::not_found(err),
            PermissionDenied => Self::permission_denied(err),
            AddrInUse | AlreadyExists => Self::already_exists(err),
            AddrNotAvailable | ConnectionRefused | NotConnected => Self::unavailable(err),
            BrokenPipe | ConnectionReset | ConnectionAborted => Self::aborted(err),
            Interrupted | WouldBlock => Self::cancelled(err),
            UnexpectedEof => Self::data_loss(err),
            TimedOut => Self::deadline_exceeded(err),
            InvalidInput | InvalidData => Self::failed_precondition(err),
            WriteZero => Self::resource_exhausted(err),
            _ => Self::unknown(err),
        }
    }
}

/// Converts WebSocket errors into appropriate error kinds.
///
/// * `ConnectionClosed` -> `Cancelled`
/// * `AlreadyClosed` -> `Unavailable`
/// * `Io` -> mapped like IO errors, except that `NotFound` and
///   `PermissionDenied` on the transport are `Unavailable`
/// * `Capacity` -> `OutOfRange`
/// * anything else -> `Unknown`
impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error::*;
        match err {
            ConnectionClosed => Self::cancelled(err),
            AlreadyClosed => Self::unavailable(err),
            Io(err) => match err.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    Self::unavailable(err)
                }
                _ => err.into(),
            },
            Capacity(err) => Self::out_of_range(err),
            _ => Self::unknown(err),
        }
    }
}

/// Malformed frames are a protocol mismatch, not a bad argument, so JSON
/// errors never count as fatal.
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::failed_precondition(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::invalid_argument(e)
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::invalid_argument(e)
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(e: tokio::time::error::Elapsed) -> Self {
        Self::deadline_exceeded(e.to_string())
    }
}
