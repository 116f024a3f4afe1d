/// Protocol framing errors.
#[derive(Debug)]
pub enum ProtocolError {
    /// A frame exceeded the line-length cap without a terminating newline.
    LineTooLong,
    /// A frame was not valid UTF-8.
    InvalidUtf8,
    Io(std::io::Error),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::LineTooLong => write!(f, "line exceeds the maximum length"),
            ProtocolError::InvalidUtf8 => write!(f, "invalid UTF-8"),
            ProtocolError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl From<std::io::Error> for ProtocolError {
    fn from(e: std::io::Error) -> Self {
        ProtocolError::Io(e)
    }
}
