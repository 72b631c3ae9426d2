//! Command-line arguments for `xconnect`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use x11_client::auth::MIT_MAGIC_COOKIE_LEN;
use x11_client::Config;

/// Connect to an X11 display and print what the server reports.
#[derive(Parser, Debug, Clone)]
#[command(name = "xconnect")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Display to connect to ([protocol/]host:display[.screen])
    ///
    /// Falls back to the configuration file, then to $DISPLAY.
    #[arg(value_name = "DISPLAY")]
    pub display: Option<String>,

    /// Configuration file path (TOML format)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// MIT-MAGIC-COOKIE-1 cookie as 32 hex digits
    #[arg(long, value_name = "HEX", env = "XCONNECT_AUTH_COOKIE")]
    pub auth_cookie: Option<String>,

    /// Fail instead of retrying without credentials when no cookie is available
    #[arg(long)]
    pub no_auth_fallback: bool,

    /// Enable verbose logging (repeat for more)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Build the client configuration.
    ///
    /// The config file is loaded first, then overridden by explicit
    /// command-line arguments.
    pub fn to_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(display) = &self.display {
            config.connection.display = Some(display.clone());
        }
        if self.no_auth_fallback {
            config.security.allow_unauthenticated = false;
        }

        config.validate()?;
        Ok(config)
    }

    /// Decode the `--auth-cookie` value, if one was given.
    pub fn cookie(&self) -> Result<Option<Vec<u8>>> {
        let Some(text) = self.auth_cookie.as_deref() else {
            return Ok(None);
        };

        let cookie = hex::decode(text.trim()).context("auth cookie is not valid hex")?;
        if cookie.len() != MIT_MAGIC_COOKIE_LEN {
            bail!(
                "auth cookie must be {} bytes, got {}",
                MIT_MAGIC_COOKIE_LEN,
                cookie.len()
            );
        }
        Ok(Some(cookie))
    }
}
