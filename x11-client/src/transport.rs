//! Transport selection and dialing.
//!
//! A parsed display picks exactly one transport, first match wins:
//!
//! 1. explicit socket path → Unix socket at `<path>:<display>`
//! 2. host → network socket to `<host>:<6000 + display>` using the given
//!    protocol (TCP when none is named)
//! 3. neither → Unix socket at `/tmp/.X11-unix/X<display>`
//!
//! Connect failures are wrapped in [`X11ClientError::Connect`] and returned
//! immediately. There is no retry and no timeout here; wrap the future in
//! `tokio::time::timeout` if one is needed.

use crate::errors::X11ClientError;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use x11_protocol::socket::AddressFamily;
use x11_protocol::{DisplaySpec, TcpSocket, X11Socket};

#[cfg(unix)]
use x11_protocol::UnixSocket;

/// Where a display's server can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialTarget {
    /// A Unix domain socket at this path.
    Unix(PathBuf),
    /// A TCP endpoint.
    Tcp {
        /// Host name or address.
        host: String,
        /// TCP port (`6000 + display`).
        port: u16,
        /// Address families the dial may use.
        family: AddressFamily,
    },
}

impl DialTarget {
    /// Decide how to reach the server for `spec`.
    pub fn resolve(spec: &DisplaySpec) -> Result<Self, X11ClientError> {
        if let Some(path) = &spec.socket_path {
            let mut path = path.clone().into_os_string();
            path.push(format!(":{}", spec.display_number));
            return Ok(DialTarget::Unix(PathBuf::from(path)));
        }

        if let Some(host) = spec.host.as_deref().filter(|h| !h.is_empty()) {
            let port = spec.tcp_port().ok_or_else(|| {
                connect_error(
                    spec,
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("display number {} has no TCP port", spec.display_number),
                    ),
                )
            })?;

            return match spec.protocol.as_deref().unwrap_or("tcp") {
                "tcp" | "inet" => Ok(DialTarget::Tcp {
                    host: host.to_string(),
                    port,
                    family: AddressFamily::Any,
                }),
                "tcp4" | "inet4" => Ok(DialTarget::Tcp {
                    host: host.to_string(),
                    port,
                    family: AddressFamily::V4,
                }),
                "tcp6" | "inet6" => Ok(DialTarget::Tcp {
                    host: host.to_string(),
                    port,
                    family: AddressFamily::V6,
                }),
                "unix" | "local" => Ok(DialTarget::Unix(PathBuf::from(format!(
                    "{}:{}",
                    host, port
                )))),
                other => Err(connect_error(
                    spec,
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("unknown network protocol {:?}", other),
                    ),
                )),
            };
        }

        Ok(DialTarget::Unix(spec.conventional_socket_path()))
    }
}

fn connect_error(spec: &DisplaySpec, source: std::io::Error) -> X11ClientError {
    X11ClientError::Connect {
        display: spec.raw().to_string(),
        source,
    }
}

/// An open connection to an X server.
pub enum Transport {
    /// TCP connection.
    Tcp(TcpSocket),
    /// Unix domain socket connection.
    #[cfg(unix)]
    Unix(UnixSocket),
}

impl Transport {
    /// Open the transport for `spec`.
    pub async fn open(spec: &DisplaySpec) -> Result<Self, X11ClientError> {
        let target = DialTarget::resolve(spec)?;
        Self::dial(&target)
            .await
            .map_err(|e| connect_error(spec, e))
    }

    /// Connect to an already resolved target.
    pub async fn dial(target: &DialTarget) -> std::io::Result<Self> {
        tracing::debug!(?target, "dialing X server");
        match target {
            DialTarget::Tcp { host, port, family } => {
                let socket = TcpSocket::connect_with_family(host, *port, *family).await?;
                Ok(Transport::Tcp(socket))
            }
            #[cfg(unix)]
            DialTarget::Unix(path) => Ok(Transport::Unix(UnixSocket::connect(path).await?)),
            #[cfg(not(unix))]
            DialTarget::Unix(path) => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                format!("unix sockets are not available: {}", path.display()),
            )),
        }
    }
}

impl X11Socket for Transport {
    fn peer_endpoint(&self) -> String {
        match self {
            Transport::Tcp(socket) => socket.peer_endpoint(),
            #[cfg(unix)]
            Transport::Unix(socket) => socket.peer_endpoint(),
        }
    }
}

impl AsyncRead for Transport {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match &mut *self {
            Transport::Tcp(socket) => Pin::new(socket).poll_read(cx, buf),
            #[cfg(unix)]
            Transport::Unix(socket) => Pin::new(socket).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Transport {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match &mut *self {
            Transport::Tcp(socket) => Pin::new(socket).poll_write(cx, buf),
            #[cfg(unix)]
            Transport::Unix(socket) => Pin::new(socket).poll_write(cx, buf),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match &mut *self {
            Transport::Tcp(socket) => Pin::new(socket).poll_flush(cx),
            #[cfg(unix)]
            Transport::Unix(socket) => Pin::new(socket).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match &mut *self {
            Transport::Tcp(socket) => Pin::new(socket).poll_shutdown(cx),
            #[cfg(unix)]
            Transport::Unix(socket) => Pin::new(socket).poll_shutdown(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolve(display: &str) -> Result<DialTarget, X11ClientError> {
        DialTarget::resolve(&DisplaySpec::parse(display).unwrap())
    }

    #[test]
    fn test_socket_path_selected_first() {
        assert_eq!(
            resolve("/tmp/launchd-abc/org.xquartz:0").unwrap(),
            DialTarget::Unix(PathBuf::from("/tmp/launchd-abc/org.xquartz:0"))
        );
    }

    #[test]
    fn test_host_selects_tcp() {
        assert_eq!(
            resolve("xserver:2").unwrap(),
            DialTarget::Tcp {
                host: "xserver".to_string(),
                port: 6002,
                family: AddressFamily::Any,
            }
        );
        assert_eq!(
            resolve("tcp6/xserver:0").unwrap(),
            DialTarget::Tcp {
                host: "xserver".to_string(),
                port: 6000,
                family: AddressFamily::V6,
            }
        );
    }

    #[test]
    fn test_unix_protocol_with_host() {
        assert_eq!(
            resolve("unix/host:1").unwrap(),
            DialTarget::Unix(PathBuf::from("host:6001"))
        );
    }

    #[test]
    fn test_no_host_uses_conventional_path() {
        assert_eq!(
            resolve(":0").unwrap(),
            DialTarget::Unix(PathBuf::from("/tmp/.X11-unix/X0"))
        );
        assert_eq!(
            resolve("tcp/:7.1").unwrap(),
            DialTarget::Unix(PathBuf::from("/tmp/.X11-unix/X7"))
        );
    }

    #[test]
    fn test_zero_padded_display_number_is_canonical() {
        assert_eq!(
            resolve("/tmp/s:01").unwrap(),
            DialTarget::Unix(PathBuf::from("/tmp/s:1"))
        );
        assert_eq!(
            resolve(":01").unwrap(),
            DialTarget::Unix(PathBuf::from("/tmp/.X11-unix/X1"))
        );
        assert_eq!(
            resolve("host:01").unwrap(),
            DialTarget::Tcp {
                host: "host".to_string(),
                port: 6001,
                family: AddressFamily::Any,
            }
        );
    }

    #[test]
    fn test_unknown_protocol_is_connect_error() {
        let err = resolve("decnet/host:0").unwrap_err();
        match err {
            X11ClientError::Connect { display, source } => {
                assert_eq!(display, "decnet/host:0");
                assert_eq!(source.kind(), std::io::ErrorKind::InvalidInput);
            }
            other => panic!("expected connect error, got {other:?}"),
        }
    }

    #[test]
    fn test_display_without_tcp_port() {
        let err = resolve("host:70000").unwrap_err();
        assert!(matches!(err, X11ClientError::Connect { .. }));
    }

    #[tokio::test]
    async fn test_open_tcp() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let target = DialTarget::Tcp {
            host: "127.0.0.1".to_string(),
            port,
            family: AddressFamily::V4,
        };
        let transport = Transport::dial(&target).await.unwrap();
        assert!(matches!(transport, Transport::Tcp(_)));
        assert_eq!(transport.peer_endpoint(), format!("127.0.0.1:{}", port));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_open_explicit_socket_path() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("xquartz");
        let listener = tokio::net::UnixListener::bind(format!("{}:0", base.display())).unwrap();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let spec = DisplaySpec::parse(&format!("{}:0", base.display())).unwrap();
        let transport = Transport::open(&spec).await.unwrap();
        assert!(matches!(transport, Transport::Unix(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_open_failure_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let display = format!("{}:9", dir.path().join("absent").display());
        let spec = DisplaySpec::parse(&display).unwrap();

        let err = Transport::open(&spec).await.err().unwrap();
        match err {
            X11ClientError::Connect { display: d, .. } => assert_eq!(d, display),
            other => panic!("expected connect error, got {other:?}"),
        }
    }
}
