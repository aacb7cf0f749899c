//! Browser launching for the web player fallback and the authorization page.

use std::{fmt, str::FromStr};

use webbrowser::Browser;

use crate::{debug, error::BrowserFallbackError};

/// Which browser the web player should be opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrowserPreference {
    #[default]
    Default,
    Firefox,
    Chrome,
}

impl FromStr for BrowserPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "default" | "system" => Ok(Self::Default),
            "firefox" => Ok(Self::Firefox),
            "chrome" | "google-chrome" => Ok(Self::Chrome),
            other => Err(format!("unknown browser: {}", other)),
        }
    }
}

impl fmt::Display for BrowserPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Default => "default browser",
            Self::Firefox => "firefox",
            Self::Chrome => "chrome",
        };
        f.write_str(name)
    }
}

/// Opens a web URL in a browser, best effort.
///
/// Implementations must report failure through the returned error and must
/// not touch any other state.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str, preference: BrowserPreference) -> Result<(), BrowserFallbackError>;
}

/// Launches the platform browser via the `webbrowser` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str, preference: BrowserPreference) -> Result<(), BrowserFallbackError> {
        let browser = match preference {
            BrowserPreference::Default => Browser::Default,
            BrowserPreference::Firefox => Browser::Firefox,
            BrowserPreference::Chrome => Browser::Chrome,
        };
        debug!("Opening {} in {}", url, preference);

        webbrowser::open_browser(browser, url).map_err(|e| BrowserFallbackError::LaunchFailed {
            browser: preference.to_string(),
            reason: e.to_string(),
        })
    }
}
