//! X11 connection setup handshake.
//!
//! The client speaks first with a 12-byte hello followed by the padded
//! authorization protocol name and data:
//!
//! ```text
//! 0   byte-order marker 0x6c ("l", little-endian)
//! 1   unused
//! 2   u16 protocol major (11)
//! 4   u16 protocol minor (0)
//! 6   u16 auth name length
//! 8   u16 auth data length
//! 10  u16 unused
//! 12  auth name, padded to 4
//!     auth data, padded to 4
//! ```
//!
//! The server answers with an 8-byte header:
//!
//! ```text
//! 0   status (0 = failed, anything else = proceed)
//! 1   reason length (only meaningful when status is 0)
//! 2   u16 protocol major
//! 4   u16 protocol minor
//! 6   u16 length of the remaining data in 4-byte units
//! ```
//!
//! A version other than 11.0 ends the handshake immediately, without reading
//! the body. Otherwise the body is read in full; a failed status yields the
//! textual reason, any other status hands the header+body buffer to the setup
//! decoder.
//!
//! # Error Handling
//!
//! Every failure is terminal. Nothing is retried here.

use crate::io::{pad, padded_len, X11InStream, X11OutStream};
use bytes::BufMut;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

/// Byte-order marker for a little-endian client.
pub const BYTE_ORDER_LSB_FIRST: u8 = 0x6c;

/// Protocol major version spoken by this client.
pub const PROTOCOL_MAJOR: u16 = 11;

/// Protocol minor version spoken by this client.
pub const PROTOCOL_MINOR: u16 = 0;

/// Size of the fixed part of the client hello.
pub const HELLO_HEADER_LEN: usize = 12;

/// Size of the fixed server response header.
pub const RESPONSE_HEADER_LEN: usize = 8;

/// Status byte the server sends when it refuses the connection.
pub const STATUS_FAILED: u8 = 0;

/// Authorization protocol name and data sent in the hello.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct AuthCredential {
    /// Authorization protocol name, e.g. "MIT-MAGIC-COOKIE-1".
    pub name: String,
    /// Opaque authorization data.
    pub data: Vec<u8>,
}

impl AuthCredential {
    /// Create a credential from a protocol name and its data.
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// The empty credential used for unauthenticated attempts.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True if neither a name nor data is present.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.data.is_empty()
    }
}

// Keep secrets out of logs.
impl std::fmt::Debug for AuthCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthCredential")
            .field("name", &self.name)
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// Ways the setup handshake can fail once the transport is open.
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// Writing the hello or reading the response failed, including short reads.
    #[error("transport failed during handshake: {0}")]
    TransportFailed(#[from] std::io::Error),

    /// The server speaks a protocol version other than 11.0.
    #[error("x protocol version mismatch: {major}.{minor}")]
    VersionMismatch {
        /// Major version reported by the server.
        major: u16,
        /// Minor version reported by the server.
        minor: u16,
    },

    /// The server refused the connection.
    #[error("x protocol authentication refused: {0}")]
    ConnectionRefused(String),
}

/// Fixed 8-byte header of the server's setup response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerResponseHeader {
    /// 0 for failure; any other value means the setup proceeds.
    pub status: u8,
    /// Length of the failure reason; meaningful only when `status` is 0.
    pub reason_len: u8,
    /// Server protocol major version.
    pub protocol_major: u16,
    /// Server protocol minor version.
    pub protocol_minor: u16,
    /// Length of the data following the header, in 4-byte units.
    pub body_units: u16,
}

impl ServerResponseHeader {
    /// Read the header off the stream.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedEof` if the server closes before 8 bytes arrive.
    pub async fn read<R: AsyncRead + Unpin>(
        instream: &mut X11InStream<R>,
    ) -> std::io::Result<Self> {
        Ok(Self {
            status: instream.read_u8().await?,
            reason_len: instream.read_u8().await?,
            protocol_major: instream.read_u16().await?,
            protocol_minor: instream.read_u16().await?,
            body_units: instream.read_u16().await?,
        })
    }

    /// The header's 8 wire bytes.
    pub fn to_bytes(&self) -> [u8; RESPONSE_HEADER_LEN] {
        let mut bytes = [0u8; RESPONSE_HEADER_LEN];
        bytes[0] = self.status;
        bytes[1] = self.reason_len;
        bytes[2..4].copy_from_slice(&self.protocol_major.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.protocol_minor.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.body_units.to_le_bytes());
        bytes
    }

    /// Length of the body in bytes.
    pub fn body_len(&self) -> usize {
        usize::from(self.body_units) * 4
    }

    /// True if the server speaks the same protocol version as this client.
    pub fn version_supported(&self) -> bool {
        self.protocol_major == PROTOCOL_MAJOR && self.protocol_minor == PROTOCOL_MINOR
    }
}

/// Outcome of a completed handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupAccepted {
    /// The parsed response header.
    pub header: ServerResponseHeader,
    /// Header and body as one contiguous buffer, ready for the setup decoder.
    pub buffer: Vec<u8>,
}

/// Length in bytes of the hello for `credential`.
pub fn hello_len(credential: &AuthCredential) -> usize {
    HELLO_HEADER_LEN + padded_len(credential.name.len()) + padded_len(credential.data.len())
}

/// Encode the client hello.
///
/// # Errors
///
/// Returns `InvalidInput` if the name or data does not fit a 16-bit length.
pub fn encode_hello(credential: &AuthCredential) -> std::io::Result<Vec<u8>> {
    let name = credential.name.as_bytes();
    let data = credential.data.as_slice();
    let name_len = wire_len(name.len(), "authorization name")?;
    let data_len = wire_len(data.len(), "authorization data")?;

    let mut buf = Vec::with_capacity(hello_len(credential));
    buf.put_u8(BYTE_ORDER_LSB_FIRST);
    buf.put_u8(0);
    buf.put_u16_le(PROTOCOL_MAJOR);
    buf.put_u16_le(PROTOCOL_MINOR);
    buf.put_u16_le(name_len);
    buf.put_u16_le(data_len);
    buf.put_u16_le(0);
    buf.put_slice(name);
    buf.put_bytes(0, pad(name.len()));
    buf.put_slice(data);
    buf.put_bytes(0, pad(data.len()));
    Ok(buf)
}

fn wire_len(len: usize, what: &str) -> std::io::Result<u16> {
    u16::try_from(len).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} too long: {} bytes", what, len),
        )
    })
}

/// Send the hello and flush it to the server.
pub async fn send_hello<W: AsyncWrite + Unpin>(
    outstream: &mut X11OutStream<W>,
    credential: &AuthCredential,
) -> Result<(), HandshakeError> {
    let hello = encode_hello(credential)?;
    outstream.write_bytes(&hello);
    outstream.flush().await?;
    tracing::debug!(
        auth_name = %credential.name,
        bytes = hello_len(credential),
        "sent connection setup request"
    );
    Ok(())
}

/// Read and classify the server's setup response.
pub async fn read_setup_response<R: AsyncRead + Unpin>(
    instream: &mut X11InStream<R>,
) -> Result<SetupAccepted, HandshakeError> {
    let header = ServerResponseHeader::read(instream).await?;
    tracing::debug!(?header, "received setup response header");

    if !header.version_supported() {
        return Err(HandshakeError::VersionMismatch {
            major: header.protocol_major,
            minor: header.protocol_minor,
        });
    }

    let mut buffer = vec![0u8; RESPONSE_HEADER_LEN + header.body_len()];
    buffer[..RESPONSE_HEADER_LEN].copy_from_slice(&header.to_bytes());
    instream.read_bytes(&mut buffer[RESPONSE_HEADER_LEN..]).await?;

    if header.status == STATUS_FAILED {
        let body = &buffer[RESPONSE_HEADER_LEN..];
        let reason_len = usize::from(header.reason_len).min(body.len());
        let reason = String::from_utf8_lossy(&body[..reason_len]).into_owned();
        return Err(HandshakeError::ConnectionRefused(reason));
    }

    Ok(SetupAccepted { header, buffer })
}

/// Run the whole exchange: send the hello, then read the response.
pub async fn perform<R, W>(
    instream: &mut X11InStream<R>,
    outstream: &mut X11OutStream<W>,
    credential: &AuthCredential,
) -> Result<SetupAccepted, HandshakeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    send_hello(outstream, credential).await?;
    read_setup_response(instream).await
}
