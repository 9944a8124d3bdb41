//! Error types for the application.

use std::io;

use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Codec-level errors shared by the chat and game API protocols.
///
/// All of these are fatal to the decode in progress: once a field has been
/// misread every later offset is wrong, so nothing is salvaged.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed varint: continuation past {max_bytes} bytes or beyond 32 bits")]
    MalformedVarint { max_bytes: usize },

    #[error("Unknown packet: 0x{id:02x}")]
    UnknownPacket { id: u8 },

    #[error("Invalid string framing: declared length {declared} is below overhead {overhead}")]
    DataFormat { declared: usize, overhead: usize },

    #[error("Packet too short: need {needed} bytes, got {got}")]
    PacketTooShort { needed: usize, got: usize },

    #[error("Field length {len} exceeds limit of {max} bytes")]
    FieldTooLarge { len: usize, max: usize },

    #[error("String of {len} bytes does not fit a one-byte length prefix")]
    StringTooLong { len: usize },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Chat connection errors.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to connect to {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("Transport closed")]
    TransportClosed,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ConnectionError {
    /// Classify a codec failure raised on the chat transport.
    ///
    /// A peer-closed socket surfaces as a plain IO error; those are folded
    /// into `TransportClosed`.
    pub fn from_codec(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Io(e) if is_closed(&e) => Self::TransportClosed,
            ProtocolError::Io(e) => Self::Io(e),
            other => Self::Protocol(other),
        }
    }
}

/// Game API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Empty response from {path}")]
    EmptyResponse { path: String },

    #[error("HTTP status {status} from {path}")]
    Status { path: String, status: u16 },

    #[error("Failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("Malformed response: {message}")]
    MalformedResponse { message: String },

    #[error("Header '{name}' contains a line break")]
    InvalidHeader { name: String },

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

fn is_closed(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::WriteZero
    )
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

/// Result type alias for connection operations.
pub type ConnectionResult<T> = std::result::Result<T, ConnectionError>;

/// Result type alias for game API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broken_pipe_maps_to_transport_closed() {
        let err = ProtocolError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert!(matches!(
            ConnectionError::from_codec(err),
            ConnectionError::TransportClosed
        ));
    }

    #[test]
    fn test_other_write_errors_are_kept() {
        let err = ProtocolError::StringTooLong { len: 300 };
        assert!(matches!(
            ConnectionError::from_codec(err),
            ConnectionError::Protocol(ProtocolError::StringTooLong { len: 300 })
        ));
    }

    #[test]
    fn test_unknown_packet_display() {
        let err = ProtocolError::UnknownPacket { id: 0xff };
        assert_eq!(err.to_string(), "Unknown packet: 0xff");
    }
}
