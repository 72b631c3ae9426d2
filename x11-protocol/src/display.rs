//! Display string parsing.
//!
//! A display string names an X server session:
//!
//! ```text
//! [protocol/][host]:display[.screen]
//! /path/to/socket:display[.screen]
//! ```
//!
//! The *last* `:` separates the host part from the display part. A host part
//! starting with `/` is an explicit local socket path (as handed out by
//! launchd on macOS); otherwise the last `/` splits an optional protocol name
//! from the host. The display part is a non-negative display number with an
//! optional `.screen` suffix.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Directory holding the conventional per-display local sockets.
pub const X11_UNIX_DIR: &str = "/tmp/.X11-unix";

/// TCP port of display `:0`; display `N` listens on `X_TCP_PORT_BASE + N`.
pub const X_TCP_PORT_BASE: u32 = 6000;

/// Errors produced while parsing a display string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayError {
    /// No display string was given and none was found in the environment.
    #[error("empty display string")]
    Empty,

    /// The display string does not follow `[protocol/][host]:display[.screen]`.
    #[error("bad display string: {0}")]
    Malformed(String),
}

/// A parsed display string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySpec {
    raw: String,
    /// Transport protocol name given before the last `/` (e.g. "tcp").
    pub protocol: Option<String>,
    /// Explicit local socket path; never set together with `host`.
    pub socket_path: Option<PathBuf>,
    /// Remote host name or address.
    pub host: Option<String>,
    /// Display number.
    pub display_number: u32,
    /// Screen requested with the `.screen` suffix, 0 if absent.
    pub screen_number: u32,
}

impl DisplaySpec {
    /// Parse a display string.
    ///
    /// # Errors
    ///
    /// [`DisplayError::Empty`] for an empty string, [`DisplayError::Malformed`]
    /// when the colon is missing, the display part is empty, or either number
    /// does not parse as a non-negative integer.
    ///
    /// # Examples
    ///
    /// ```
    /// use x11_protocol::display::DisplaySpec;
    ///
    /// let spec = DisplaySpec::parse("tcp/xserver:1.2").unwrap();
    /// assert_eq!(spec.protocol.as_deref(), Some("tcp"));
    /// assert_eq!(spec.host.as_deref(), Some("xserver"));
    /// assert_eq!(spec.display_number, 1);
    /// assert_eq!(spec.screen_number, 2);
    /// ```
    pub fn parse(raw: &str) -> Result<Self, DisplayError> {
        if raw.is_empty() {
            return Err(DisplayError::Empty);
        }
        let malformed = || DisplayError::Malformed(raw.to_string());

        let colon = raw.rfind(':').ok_or_else(malformed)?;
        let (host_part, display_part) = (&raw[..colon], &raw[colon + 1..]);

        let mut protocol = None;
        let mut socket_path = None;
        let mut host = None;

        if host_part.starts_with('/') {
            socket_path = Some(PathBuf::from(host_part));
        } else {
            let name = match host_part.rfind('/') {
                Some(slash) => {
                    protocol = non_empty(&host_part[..slash]);
                    &host_part[slash + 1..]
                }
                None => host_part,
            };
            host = non_empty(name);
        }

        if display_part.is_empty() {
            return Err(malformed());
        }

        let (display_str, screen_str) = match display_part.rfind('.') {
            Some(dot) => (&display_part[..dot], Some(&display_part[dot + 1..])),
            None => (display_part, None),
        };

        let display_number = display_str.parse::<u32>().map_err(|_| malformed())?;

        let screen_number = match screen_str {
            Some(s) if !s.is_empty() => s.parse::<u32>().map_err(|_| malformed())?,
            _ => 0,
        };

        Ok(Self {
            raw: raw.to_string(),
            protocol,
            socket_path,
            host,
            display_number,
            screen_number,
        })
    }

    /// The display string this spec was parsed from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// TCP port the server for this display listens on, if it fits in a port.
    pub fn tcp_port(&self) -> Option<u16> {
        X_TCP_PORT_BASE
            .checked_add(self.display_number)
            .and_then(|port| u16::try_from(port).ok())
    }

    /// The conventional local socket path, `/tmp/.X11-unix/X<N>`.
    pub fn conventional_socket_path(&self) -> PathBuf {
        Path::new(X11_UNIX_DIR).join(format!("X{}", self.display_number))
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

impl FromStr for DisplaySpec {
    type Err = DisplayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DisplaySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.socket_path {
            write!(f, "{}", path.display())?;
        } else {
            if let Some(protocol) = &self.protocol {
                write!(f, "{}/", protocol)?;
            }
            if let Some(host) = &self.host {
                f.write_str(host)?;
            }
        }
        write!(f, ":{}.{}", self.display_number, self.screen_number)
    }
}
