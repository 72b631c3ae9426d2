//! Buffered I/O streams for X11 connection setup traffic.
//!
//! The client opens every session with the `0x6c` ("l") byte-order marker, so
//! all multi-byte integers on the wire are **little-endian**. The streams in
//! this module hide that detail behind typed `read_*` helpers; writes go out
//! as pre-encoded byte runs.
//!
//! Variable-length fields are padded with zero bytes to a 4-byte boundary;
//! [`pad`] and [`padded_len`] do that arithmetic.
//!
//! # Examples
//!
//! ```no_run
//! use x11_protocol::io::{X11InStream, X11OutStream};
//! use x11_protocol::TcpSocket;
//!
//! # async fn example() -> std::io::Result<()> {
//! let socket = TcpSocket::connect("localhost", 6000).await?;
//! let (reader, writer) = tokio::io::split(socket);
//!
//! let mut output = X11OutStream::new(writer);
//! output.write_bytes(&[0x6c, 0, 11, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
//! output.flush().await?;
//!
//! let mut input = X11InStream::new(reader);
//! let status = input.read_u8().await?;
//! let reason_len = input.read_u8().await?;
//! let major = input.read_u16().await?;
//! # Ok(())
//! # }
//! ```

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const BUFFER_CAPACITY: usize = 8192;

/// Number of zero bytes needed after a field of `n` bytes so the next field
/// starts on a 4-byte boundary. Always in `0..=3`.
///
/// # Examples
///
/// ```
/// use x11_protocol::io::pad;
///
/// assert_eq!(pad(0), 0);
/// assert_eq!(pad(18), 2);
/// assert_eq!(pad(16), 0);
/// ```
#[must_use]
pub const fn pad(n: usize) -> usize {
    (4 - (n % 4)) % 4
}

/// Size of a field of `n` bytes once padded to a 4-byte boundary.
///
/// # Examples
///
/// ```
/// use x11_protocol::io::padded_len;
///
/// assert_eq!(padded_len(18), 20);
/// assert_eq!(padded_len(padded_len(18)), 20);
/// ```
#[must_use]
pub const fn padded_len(n: usize) -> usize {
    n + pad(n)
}

/// Buffered input stream for reading X11 protocol data.
///
/// Data is pulled from the underlying reader on demand and kept in an
/// internal buffer (default 8KB), so typed reads do not cost a syscall each.
/// Reads that hit EOF early fail with [`std::io::ErrorKind::UnexpectedEof`].
pub struct X11InStream<R> {
    reader: R,
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> X11InStream<R> {
    /// Create a new input stream with the default buffer size (8KB).
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(BUFFER_CAPACITY),
        }
    }

    /// Ensure at least `n` bytes are available in the buffer.
    async fn ensure_bytes(&mut self, n: usize) -> std::io::Result<()> {
        while self.buffer.len() < n {
            let bytes_read = self.reader.read_buf(&mut self.buffer).await?;
            if bytes_read == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("expected {} bytes, got {}", n, self.buffer.len()),
                ));
            }
        }
        Ok(())
    }

    /// Read a single byte.
    pub async fn read_u8(&mut self) -> std::io::Result<u8> {
        self.ensure_bytes(1).await?;
        Ok(self.buffer.get_u8())
    }

    /// Read a little-endian 16-bit unsigned integer.
    pub async fn read_u16(&mut self) -> std::io::Result<u16> {
        self.ensure_bytes(2).await?;
        Ok(self.buffer.get_u16_le())
    }

    /// Read exactly `buf.len()` bytes into the provided buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if EOF is reached before the buffer is filled,
    /// or if an I/O error occurs.
    pub async fn read_bytes(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        self.ensure_bytes(buf.len()).await?;
        self.buffer.copy_to_slice(buf);
        Ok(())
    }
}

/// Buffered output stream for writing X11 protocol data.
///
/// Writes are collected in memory and only hit the wire on
/// [`flush()`](Self::flush). Dropping the stream without flushing loses
/// whatever is still buffered.
pub struct X11OutStream<W> {
    writer: W,
    buffer: BytesMut,
}

impl<W: AsyncWrite + Unpin> X11OutStream<W> {
    /// Create a new output stream with the default buffer size (8KB).
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: BytesMut::with_capacity(BUFFER_CAPACITY),
        }
    }

    /// Write a byte slice to the buffer.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Flush all buffered data to the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails or if the underlying writer's
    /// `flush()` method returns an error.
    pub async fn flush(&mut self) -> std::io::Result<()> {
        if !self.buffer.is_empty() {
            self.writer.write_all(&self.buffer).await?;
            self.buffer.clear();
        }
        self.writer.flush().await
    }
}
