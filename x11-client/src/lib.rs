//! Opening sessions with an X11 display server.
//!
//! This crate drives the connection setup on top of the wire-level pieces in
//! `x11-protocol`: it resolves the display string, dials the right transport,
//! chooses the authorization credential, performs the handshake and hands
//! back a [`Connection`] holding the server's setup information.
//!
//! # Quick Start
//!
//! ```no_run
//! use x11_client::{Config, Connector, EnvDisplay, NoAuthority};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), x11_client::X11ClientError> {
//!     let connector = Connector::new(Config::default(), NoAuthority);
//!     let conn = connector.connect(&EnvDisplay).await?;
//!     println!("vendor: {}", conn.setup().vendor);
//!     Ok(())
//! }
//! ```
//!
//! # Flow
//!
//! 1. Display string → [`x11_protocol::DisplaySpec`] (explicit, configured,
//!    or from a [`DisplayProvider`])
//! 2. [`DialTarget`] → [`Transport`] (Unix socket or TCP)
//! 3. [`Authenticator`] → credential (falls back to none, with a warning)
//! 4. Hello → response header → body → [`x11_protocol::Setup`]
//!
//! Each step is awaited before the next starts. Failures are returned as
//! [`X11ClientError`] and are never retried internally.
//!
//! # Safety
//!
//! This crate is `#![forbid(unsafe_code)]` and uses only safe Rust.

#![forbid(unsafe_code)]
#![deny(missing_docs, clippy::all)]

pub mod auth;
pub mod config;
pub mod connection;
pub mod environment;
pub mod errors;
pub mod transport;

// Re-exports
pub use auth::{AuthorityError, AuthorityLookup, Authenticator, NoAuthority, StaticAuthority};
pub use config::Config;
pub use connection::{Connection, Connector, SetupDecoder, WireSetupDecoder};
pub use environment::{resolve_display, DisplayProvider, EnvDisplay, StaticDisplay};
pub use errors::X11ClientError;
pub use transport::{DialTarget, Transport};
