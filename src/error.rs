use std::error::Error as StdError;
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of what went wrong, used by callers to decide
/// whether a request is rejected, aborted or simply not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed range, too many subtitle matches, or a request type that
    /// is not allowed in the calling context.
    InvalidRequest,
    /// More content fragments than a single request may carry.
    TooLongRequest,
    /// Catalog, quote or chain lookup came back empty.
    NotFound,
    /// The video could not be opened, inspected or read.
    Decode,
    Io,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidRequest => "invalid request",
            ErrorKind::TooLongRequest => "too long request",
            ErrorKind::NotFound => "not found",
            ErrorKind::Decode => "decode error",
            ErrorKind::Io => "io error",
            ErrorKind::Other => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    context: String,
    cause: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl Error {
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Error {
            kind,
            context: message.into(),
            cause: None,
        }
    }

    pub fn context<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Other, message)
    }

    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn decode<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Decode, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Re-tag an error without losing its message or cause.
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Iterate over this error and every underlying cause.
    pub fn iter(&self) -> impl Iterator<Item = &(dyn StdError + 'static)> {
        let first: &(dyn StdError + 'static) = self;
        std::iter::successors(Some(first), |&err| err.source())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.context)?;
        if let Some(cause) = self.source() {
            write!(f, "\nCaused by: {}", cause)?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_ref()
            .map(|boxed| boxed.as_ref() as &(dyn StdError + 'static))
    }
}

pub trait ResultExt<T> {
    fn context<S: Into<String>>(self, message: S) -> Result<T>;

    fn context_kind<S: Into<String>>(self, kind: ErrorKind, message: S) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn context<S: Into<String>>(self, message: S) -> Result<T> {
        self.context_kind(ErrorKind::Other, message)
    }

    fn context_kind<S: Into<String>>(self, kind: ErrorKind, message: S) -> Result<T> {
        self.map_err(|e| Error {
            kind,
            context: message.into(),
            cause: Some(e.into()),
        })
    }
}
