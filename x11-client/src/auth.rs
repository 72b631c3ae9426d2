//! Authorization credentials for the setup handshake.
//!
//! Credentials come from an [`AuthorityLookup`] collaborator keyed by host and
//! display number. The only scheme this client speaks is
//! `MIT-MAGIC-COOKIE-1` with a 16-byte cookie; anything else the authority
//! hands back is rejected rather than sent.
//!
//! When the lookup itself fails the [`Authenticator`] can fall back to an
//! unauthenticated attempt. That fallback is logged as a warning so a session
//! that silently lost its credentials shows up in the logs, and it can be
//! switched off through [`SecurityConfig`](crate::config::SecurityConfig).

use crate::errors::X11ClientError;
use thiserror::Error;
use x11_protocol::AuthCredential;

/// The single authorization protocol this client supports.
pub const MIT_MAGIC_COOKIE_1: &str = "MIT-MAGIC-COOKIE-1";

/// Length of an MIT-MAGIC-COOKIE-1 cookie.
pub const MIT_MAGIC_COOKIE_LEN: usize = 16;

/// Failure reported by an authority collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct AuthorityError(pub String);

impl AuthorityError {
    /// Create an error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Supplies the credential for a host and display.
pub trait AuthorityLookup: Send + Sync {
    /// Look up the credential for `host` (empty for local connections) and
    /// `display`.
    fn lookup(&self, host: &str, display: u32) -> Result<AuthCredential, AuthorityError>;
}

/// An authority that never has a credential.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthority;

impl AuthorityLookup for NoAuthority {
    fn lookup(&self, host: &str, display: u32) -> Result<AuthCredential, AuthorityError> {
        Err(AuthorityError::new(format!(
            "no authority configured for {}:{}",
            host, display
        )))
    }
}

/// An authority that returns the same credential for every display.
#[derive(Debug, Clone)]
pub struct StaticAuthority {
    credential: AuthCredential,
}

impl StaticAuthority {
    /// Serve `credential` for every lookup.
    pub fn new(credential: AuthCredential) -> Self {
        Self { credential }
    }

    /// Serve an MIT-MAGIC-COOKIE-1 credential carrying `cookie`.
    pub fn mit_magic_cookie(cookie: impl Into<Vec<u8>>) -> Self {
        Self::new(AuthCredential::new(MIT_MAGIC_COOKIE_1, cookie))
    }
}

impl AuthorityLookup for StaticAuthority {
    fn lookup(&self, _host: &str, _display: u32) -> Result<AuthCredential, AuthorityError> {
        Ok(self.credential.clone())
    }
}

/// Turns authority lookups into the credential sent in the hello.
pub struct Authenticator<'a> {
    authority: &'a dyn AuthorityLookup,
    allow_unauthenticated: bool,
}

impl<'a> Authenticator<'a> {
    /// Create an authenticator over `authority`.
    pub fn new(authority: &'a dyn AuthorityLookup, allow_unauthenticated: bool) -> Self {
        Self {
            authority,
            allow_unauthenticated,
        }
    }

    /// The credential to send and whether it authenticates the client.
    ///
    /// A lookup failure yields the empty credential and `false` (after a
    /// warning), unless unauthenticated fallback is disabled.
    ///
    /// # Errors
    ///
    /// [`X11ClientError::UnsupportedAuthProtocol`] if the authority returned
    /// something other than a 16-byte MIT-MAGIC-COOKIE-1, and
    /// [`X11ClientError::AuthorityUnavailable`] if the lookup failed with
    /// fallback disabled.
    pub fn credential(
        &self,
        host: &str,
        display_number: u32,
    ) -> Result<(AuthCredential, bool), X11ClientError> {
        match self.authority.lookup(host, display_number) {
            Ok(credential) => {
                validate_shape(&credential)?;
                tracing::debug!(host, display_number, auth_name = %credential.name, "using authority credential");
                Ok((credential, true))
            }
            Err(err) if self.allow_unauthenticated => {
                tracing::warn!(
                    host,
                    display_number,
                    error = %err,
                    "could not get authority info; trying connection without authority info"
                );
                Ok((AuthCredential::empty(), false))
            }
            Err(err) => Err(X11ClientError::AuthorityUnavailable(err.to_string())),
        }
    }
}

fn validate_shape(credential: &AuthCredential) -> Result<(), X11ClientError> {
    if credential.name != MIT_MAGIC_COOKIE_1 || credential.data.len() != MIT_MAGIC_COOKIE_LEN {
        return Err(X11ClientError::UnsupportedAuthProtocol(
            credential.name.clone(),
        ));
    }
    Ok(())
}
