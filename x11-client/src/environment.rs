//! Source of the "current display" when the caller does not name one.

use crate::errors::X11ClientError;
use x11_protocol::DisplaySpec;

/// Name of the environment variable holding the current display.
pub const DISPLAY_ENV: &str = "DISPLAY";

/// Supplies the display to use when no explicit one is given.
pub trait DisplayProvider {
    /// The current display string, if any.
    fn current_display(&self) -> Option<String>;
}

/// Reads the `DISPLAY` environment variable.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvDisplay;

impl DisplayProvider for EnvDisplay {
    fn current_display(&self) -> Option<String> {
        std::env::var(DISPLAY_ENV).ok()
    }
}

/// A fixed display value.
#[derive(Debug, Clone, Default)]
pub struct StaticDisplay(pub Option<String>);

impl StaticDisplay {
    /// A provider that always returns `display`.
    pub fn new(display: impl Into<String>) -> Self {
        Self(Some(display.into()))
    }

    /// A provider with no display set.
    pub fn unset() -> Self {
        Self(None)
    }
}

impl DisplayProvider for StaticDisplay {
    fn current_display(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Pick the display string and parse it.
///
/// A non-empty `explicit` value wins; otherwise the provider is asked.
pub fn resolve_display(
    explicit: Option<&str>,
    provider: &dyn DisplayProvider,
) -> Result<DisplaySpec, X11ClientError> {
    let raw = match explicit.filter(|s| !s.is_empty()) {
        Some(display) => display.to_string(),
        None => provider.current_display().unwrap_or_default(),
    };
    Ok(DisplaySpec::parse(&raw)?)
}
