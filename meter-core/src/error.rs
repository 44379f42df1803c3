use thiserror::Error;

/// Failures raised by (or propagated through) the transport collaborator
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(std::io::Error),

    #[error("Timeout")]
    Timeout,

    #[error("Permission denied. Check permissions for {port}, fix with 'usermod -a -G dialout <USER_NAME>'")]
    PermissionDenied { port: String },

    #[error("Port not found: {port}")]
    PortNotFound { port: String },

    #[error("Failed opening port {port}: {reason}")]
    Open { port: String, reason: String },

    #[error("Connection is not open")]
    NotOpen,
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut => TransportError::Timeout,
            _ => TransportError::Io(e),
        }
    }
}

/// Main error type for meter protocol operations
#[derive(Error, Debug)]
pub enum MeterError {
    #[error("Invalid checksum. Calculated value of 0x{expected:02X} does not match response checksum value of 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("{expected_marker} expected")]
    Framing { expected_marker: &'static str },

    #[error("Range error: {0}")]
    Range(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl From<std::io::Error> for MeterError {
    fn from(e: std::io::Error) -> Self {
        MeterError::Transport(e.into())
    }
}

/// Result type alias for meter protocol operations
pub type MeterResult<T> = Result<T, MeterError>;
