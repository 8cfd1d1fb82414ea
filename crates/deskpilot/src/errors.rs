use thiserror::Error;

/// Errors surfaced by the automation core and the gesture layer.
///
/// Resolution and search never use `ElementNotFound`/`WindowNotFound`
/// themselves: they return `Ok(None)`. The gesture layer converts a missing
/// target into one of these when an action cannot proceed without it.
#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Window not found: {0}")]
    WindowNotFound(String),

    #[error("Invalid criterion: {0}")]
    InvalidCriterion(String),

    #[error("Invalid key token: {0}")]
    InvalidKeyToken(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Stale handle: {0}")]
    StaleHandle(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Platform error: {0}")]
    PlatformError(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AutomationError {
    /// True for errors raised by validating caller input, before any side effect.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AutomationError::InvalidCriterion(_)
                | AutomationError::InvalidKeyToken(_)
                | AutomationError::InvalidArgument(_)
        )
    }
}

impl From<regex::Error> for AutomationError {
    fn from(e: regex::Error) -> Self {
        AutomationError::InvalidCriterion(format!("malformed regular expression: {e}"))
    }
}

#[cfg(target_os = "windows")]
impl From<uiautomation::Error> for AutomationError {
    fn from(e: uiautomation::Error) -> Self {
        AutomationError::PlatformError(e.to_string())
    }
}

#[cfg(target_os = "windows")]
impl From<windows::core::Error> for AutomationError {
    fn from(e: windows::core::Error) -> Self {
        AutomationError::PlatformError(e.to_string())
    }
}
