//! Spotify Playback Control Library
//!
//! This library drives the OAuth 2.0 authorization-code lifecycle against the
//! Spotify accounts service and dispatches playback commands (play, pause,
//! skip, volume, repeat) to a resolved output device, falling back to the web
//! player in a browser when no controllable device is available.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints for the local OAuth callback server
//! - `browser` - Browser launching for the web player fallback
//! - `cli` - Command handlers and the interactive shell
//! - `config` - Settings loaded from the environment and `.env` files
//! - `error` - Error taxonomy shared by all layers
//! - `management` - Token state and durable key-value persistence
//! - `server` - Local HTTP server for OAuth callbacks
//! - `session` - One operation per command verb, wrapped in the retry policy
//! - `spotify` - Spotify Web API client: auth, devices, playback, catalog
//! - `types` - Wire types and data structures
//! - `utils` - Nonce generation and cancellable polling
//!
//! # Example
//!
//! ```no_run
//! use spotctl::{config, session::SpotifySession};
//!
//! #[tokio::main]
//! async fn main() -> spotctl::Res<()> {
//!     config::load_env().await;
//!     let settings = config::Settings::from_env()?;
//!     // Build a session and issue commands...
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod browser;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod server;
pub mod session;
pub mod spotify;
pub mod types;
pub mod utils;

pub use error::Error;

/// Result alias used across the crate.
///
/// Every fallible operation in the library reports one of the variants of
/// [`Error`], so callers can tell authorization failures (recoverable by a
/// token refresh) apart from everything else.
pub type Res<T> = std::result::Result<T, Error>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```ignore
/// info!("Starting authentication process...");
/// info!("Found {} devices", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only the binary uses this, for preconditions that cannot be remediated
/// (for example missing client credentials). Library code returns errors.
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Used for recoverable issues such as a refresh token that could not be
/// written to disk.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a dimmed diagnostic line when `SPOTCTL_DEBUG` is set.
#[macro_export]
macro_rules! debug {
  ($($arg:tt)*) => ({
    if std::env::var_os("SPOTCTL_DEBUG").is_some() {
      use colored::Colorize;
      eprintln!("[{}] {}", "d".dimmed(), std::format_args!($($arg)*));
    }
  })
}
