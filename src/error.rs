/// Error type
#[derive(Debug)]
pub enum Error {
    /// An IO error.
    Io(std::io::Error),

    /// Error in storage backend.
    Storage(fjall::Error),

    /// A non-positive width was passed to bucketing math.
    InvalidBucketWidth(i64),

    /// The storage backend does not support this operation.
    ///
    /// E.g. calling `add` on a backend with overwrite-only semantics.
    Unsupported(&'static str),
}

impl From<fjall::Error> for Error {
    fn from(value: fjall::Error) -> Self {
        Self::Storage(value)
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Storage(e) => {
                write!(f, "{e}",)
            }
            Self::Io(e) => {
                write!(f, "{e}",)
            }
            Self::InvalidBucketWidth(w) => {
                write!(f, "InvalidBucketWidth({w})",)
            }
            Self::Unsupported(op) => {
                write!(f, "Unsupported({op})",)
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result helper type
pub type Result<T> = std::result::Result<T, Error>;
