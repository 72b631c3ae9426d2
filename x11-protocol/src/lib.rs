//! X11 connection setup protocol.
//!
//! This crate holds the wire-level pieces needed to open a session with an X
//! server: display string parsing, local and TCP sockets, little-endian
//! buffered streams, the setup handshake codec, and the decoder for the
//! server's setup block.
//!
//! # Modules
//!
//! - [`display`] - Display string parsing (`[protocol/][host]:display[.screen]`)
//! - [`socket`] - Socket abstractions (TCP, Unix domain)
//! - [`io`] - Buffered I/O streams (X11InStream, X11OutStream) and padding math
//! - [`handshake`] - Client hello encoding and server response decoding
//! - [`setup`] - Structured setup information (screens, formats, vendor)
//!
//! # Examples
//!
//! ```no_run
//! use x11_protocol::{DisplaySpec, TcpSocket, X11Socket};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let spec = DisplaySpec::parse("xserver:1")?;
//! let port = spec.tcp_port().expect("display number fits a TCP port");
//! let socket = TcpSocket::connect(spec.host.as_deref().unwrap(), port).await?;
//! println!("Connected to: {}", socket.peer_endpoint());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod display;
pub mod handshake;
pub mod io;
pub mod setup;
pub mod socket;

// Re-export commonly used types
pub use display::{DisplayError, DisplaySpec};
pub use handshake::{AuthCredential, HandshakeError, ServerResponseHeader, SetupAccepted};
pub use io::{pad, padded_len, X11InStream, X11OutStream};
pub use setup::Setup;
pub use socket::{AddressFamily, TcpSocket, X11Socket};

#[cfg(unix)]
pub use socket::UnixSocket;
