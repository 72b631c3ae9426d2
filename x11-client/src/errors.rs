//! Error types for the X11 client.

use std::io;
use thiserror::Error;
use x11_protocol::{DisplayError, HandshakeError};

/// Errors that can occur while opening an X11 connection.
///
/// Every variant is terminal for the attempt that produced it; the client
/// never retries on its own. [`is_retryable`](Self::is_retryable) tells a
/// caller which failures might succeed if it tries again later.
#[derive(Debug, Error)]
pub enum X11ClientError {
    /// No display string was given and none was found in the environment.
    #[error("empty display string")]
    EmptyDisplaySpec,

    /// The display string could not be parsed.
    #[error("bad display string: {0}")]
    MalformedDisplaySpec(String),

    /// The transport for the display could not be opened.
    #[error("cannot connect to {display}: {source}")]
    Connect {
        /// The display string being connected to.
        display: String,
        /// Underlying connect failure.
        #[source]
        source: io::Error,
    },

    /// The authority supplied a credential for a scheme this client cannot use.
    #[error("unsupported auth protocol {0}")]
    UnsupportedAuthProtocol(String),

    /// Authority lookup failed and unauthenticated fallback is disabled.
    #[error("authority unavailable: {0}")]
    AuthorityUnavailable(String),

    /// Reading or writing the transport failed during the handshake.
    #[error("Transport error: {0}")]
    TransportFailed(#[from] io::Error),

    /// The server speaks a protocol version other than 11.0.
    #[error("x protocol version mismatch: {major}.{minor}")]
    VersionMismatch {
        /// Server major version.
        major: u16,
        /// Server minor version.
        minor: u16,
    },

    /// The server refused the connection.
    #[error("x protocol authentication refused: {0}")]
    ConnectionRefused(String),

    /// The setup block could not be decoded.
    #[error("Setup decode failed: {0}")]
    SetupDecode(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl X11ClientError {
    /// Returns true if this error is potentially retryable.
    ///
    /// Transport problems may clear up (the server was restarting, the
    /// network blipped). Bad display strings, refusals, version and
    /// authentication mismatches will fail the same way again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::TransportFailed(_))
    }

    /// Returns true if this is a fatal error that should not be retried.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.is_retryable()
    }
}

impl From<DisplayError> for X11ClientError {
    fn from(err: DisplayError) -> Self {
        match err {
            DisplayError::Empty => Self::EmptyDisplaySpec,
            DisplayError::Malformed(raw) => Self::MalformedDisplaySpec(raw),
        }
    }
}

impl From<HandshakeError> for X11ClientError {
    fn from(err: HandshakeError) -> Self {
        match err {
            HandshakeError::TransportFailed(e) => Self::TransportFailed(e),
            HandshakeError::VersionMismatch { major, minor } => {
                Self::VersionMismatch { major, minor }
            }
            HandshakeError::ConnectionRefused(reason) => Self::ConnectionRefused(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categorization() {
        assert!(X11ClientError::TransportFailed(io::Error::from(io::ErrorKind::BrokenPipe))
            .is_retryable());
        assert!(X11ClientError::Connect {
            display: ":0".to_string(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        }
        .is_retryable());

        assert!(X11ClientError::ConnectionRefused("no".to_string()).is_fatal());
        assert!(X11ClientError::VersionMismatch { major: 10, minor: 0 }.is_fatal());
        assert!(X11ClientError::UnsupportedAuthProtocol("XDM".to_string()).is_fatal());
        assert!(X11ClientError::EmptyDisplaySpec.is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = X11ClientError::UnsupportedAuthProtocol("XDM-AUTHORIZATION-1".to_string());
        assert_eq!(err.to_string(), "unsupported auth protocol XDM-AUTHORIZATION-1");

        let err = X11ClientError::Connect {
            display: "host:3".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert_eq!(err.to_string(), "cannot connect to host:3: refused");
    }

    #[test]
    fn test_from_protocol_errors() {
        let err: X11ClientError = DisplayError::Malformed("bogus".to_string()).into();
        assert!(matches!(err, X11ClientError::MalformedDisplaySpec(ref raw) if raw == "bogus"));

        let err: X11ClientError = HandshakeError::VersionMismatch { major: 10, minor: 4 }.into();
        assert!(matches!(err, X11ClientError::VersionMismatch { major: 10, minor: 4 }));

        let err: X11ClientError = HandshakeError::ConnectionRefused("nope!".to_string()).into();
        assert_eq!(err.to_string(), "x protocol authentication refused: nope!");
    }
}
