use crate::protocol::ProtocolError;

/// Session error types.
#[derive(Debug)]
pub enum SessionError {
    Io(std::io::Error),
    Protocol(ProtocolError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Io(e) => write!(f, "I/O error: {}", e),
            SessionError::Protocol(e) => write!(f, "protocol error: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<std::io::Error> for SessionError {
    fn from(e: std::io::Error) -> Self {
        SessionError::Io(e)
    }
}

impl From<ProtocolError> for SessionError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::Io(e) => SessionError::Io(e),
            other => SessionError::Protocol(other),
        }
    }
}
