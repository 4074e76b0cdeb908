use thiserror::Error;

pub type Result<T> = std::result::Result<T, EditError>;

/// Coarse classification of an [`EditError`].
///
/// Callers that only need to decide how to report a failure match on this
/// instead of on the individual variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input: unknown names, out-of-range indices, malformed parameters
    /// or malformed codec input.
    InvalidArgument,
    /// The target is valid but cannot be used right now.
    IllegalState,
    /// The underlying byte stream failed.
    Io,
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("coordinate ({row}, {col}) outside {width}x{height} image")]
    OutOfRange {
        row: usize,
        col: usize,
        width: usize,
        height: usize,
    },

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("malformed image data: {0}")]
    Format(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] image::ImageError),

    #[error("project file error: {0}")]
    Project(String),
}

impl EditError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IllegalState(_) => ErrorKind::IllegalState,
            Self::Io(_) => ErrorKind::Io,
            Self::InvalidArgument(_)
            | Self::OutOfRange { .. }
            | Self::Format(_)
            | Self::Unsupported(_)
            | Self::Codec(_)
            | Self::Project(_) => ErrorKind::InvalidArgument,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn illegal(msg: impl Into<String>) -> Self {
        Self::IllegalState(msg.into())
    }
}

impl From<Box<bincode::ErrorKind>> for EditError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        Self::Project(e.to_string())
    }
}
