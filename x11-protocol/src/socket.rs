//! Socket abstractions for X11 connections.
//!
//! An X server listens on a local domain socket (`/tmp/.X11-unix/X<N>` or an
//! explicit launcher path) and optionally on TCP port `6000 + N`. Both socket
//! types implement [`X11Socket`] so the handshake code does not care which one
//! it is talking to.
//!
//! # Examples
//!
//! ```no_run
//! use x11_protocol::socket::{TcpSocket, X11Socket};
//!
//! # async fn example() -> anyhow::Result<()> {
//! // Display :1 on a remote host
//! let socket = TcpSocket::connect("xserver.local", 6001).await?;
//! println!("Connected to: {}", socket.peer_endpoint());
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;

/// Core trait for X11 transport sockets.
///
/// Extends [`AsyncRead`] and [`AsyncWrite`] with peer information used for
/// logging and error messages.
pub trait X11Socket: AsyncRead + AsyncWrite + Send + Unpin {
    /// Get the peer endpoint including port/path information.
    ///
    /// For TCP sockets, this returns "address:port" (e.g., "192.168.1.100:6000").
    /// For Unix domain sockets, this returns "unix:path" (e.g., "unix:/tmp/.X11-unix/X0").
    fn peer_endpoint(&self) -> String;
}

/// Which IP family a TCP dial may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressFamily {
    /// Any resolved address.
    #[default]
    Any,
    /// IPv4 addresses only.
    V4,
    /// IPv6 addresses only.
    V6,
}

impl AddressFamily {
    fn accepts(self, addr: &SocketAddr) -> bool {
        match self {
            AddressFamily::Any => true,
            AddressFamily::V4 => addr.is_ipv4(),
            AddressFamily::V6 => addr.is_ipv6(),
        }
    }
}

/// TCP socket wrapper for X11 connections.
///
/// `TCP_NODELAY` is enabled on connect; X11 requests are small and latency
/// sensitive.
pub struct TcpSocket {
    stream: TcpStream,
    peer_addr: SocketAddr,
}

impl TcpSocket {
    /// Connect to an X server via TCP using any address family.
    ///
    /// # Errors
    ///
    /// Returns an error if name resolution fails or every resolved address
    /// refuses the connection.
    pub async fn connect(host: &str, port: u16) -> std::io::Result<Self> {
        Self::connect_with_family(host, port, AddressFamily::Any).await
    }

    /// Connect to an X server via TCP, restricted to one address family.
    ///
    /// Resolved addresses are tried in order; the last connect error is
    /// returned if none succeed.
    pub async fn connect_with_family(
        host: &str,
        port: u16,
        family: AddressFamily,
    ) -> std::io::Result<Self> {
        let mut last_err = None;

        for addr in tokio::net::lookup_host((host, port)).await? {
            if !family.accepts(&addr) {
                continue;
            }
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    let peer_addr = stream.peer_addr()?;
                    tracing::debug!(%peer_addr, "TCP connection established");
                    return Ok(Self { stream, peer_addr });
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                format!("no {:?} address found for {}:{}", family, host, port),
            )
        }))
    }

    /// Get the underlying TCP stream.
    pub fn into_inner(self) -> TcpStream {
        self.stream
    }
}

impl X11Socket for TcpSocket {
    fn peer_endpoint(&self) -> String {
        self.peer_addr.to_string()
    }
}

impl AsyncRead for TcpSocket {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for TcpSocket {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

/// Unix domain socket wrapper for local X11 connections.
///
/// Only available on Unix-like systems.
#[cfg(unix)]
pub struct UnixSocket {
    stream: UnixStream,
    path: PathBuf,
}

#[cfg(unix)]
impl UnixSocket {
    /// Connect to an X server via Unix domain socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket file is missing, not accepting
    /// connections, or not accessible.
    pub async fn connect(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path_ref = path.as_ref();
        let stream = UnixStream::connect(path_ref).await?;
        tracing::debug!(path = %path_ref.display(), "Unix connection established");
        Ok(Self {
            stream,
            path: path_ref.to_path_buf(),
        })
    }

    /// Path this socket is connected to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the underlying Unix stream.
    pub fn into_inner(self) -> UnixStream {
        self.stream
    }
}

#[cfg(unix)]
impl X11Socket for UnixSocket {
    fn peer_endpoint(&self) -> String {
        format!("unix:{}", self.path.display())
    }
}

#[cfg(unix)]
impl AsyncRead for UnixSocket {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

#[cfg(unix)]
impl AsyncWrite for UnixSocket {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}
