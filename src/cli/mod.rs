//! # CLI Module
//!
//! Command handlers behind the `spotctl` binary and the interactive shell.
//! Each handler calls one [`SpotifySession`](crate::session::SpotifySession)
//! operation and renders its outcome with the logging macros or a table.
//!
//! ## Command Categories
//!
//! ### Authentication
//!
//! - [`auth`] - Runs a fresh authorization
//! - [`logout`] - Forgets the stored session
//!
//! ### Playback
//!
//! - [`play`] - Plays a track, album or playlist, falling back to the web player
//! - [`toggle`], [`volume`], [`next`], [`previous`], [`repeat`], [`repeat_mode`]
//! - [`current`] - Shows what is playing
//!
//! ### Catalog
//!
//! - [`search`], [`new_releases`], [`playlists`], [`devices`]
//!
//! ### Shell
//!
//! - [`shell`] - Interactive loop that keeps the last listings in a
//!   [`ShellContext`] so numbered entries can be played
//!
//! ## Usage Patterns
//!
//! ```bash
//! spotctl auth                              # Authorize with Spotify
//! spotctl search "daft punk"                # Search tracks
//! spotctl play spotify:album:4m2880jivSbbyEGAKfITCa
//! spotctl volume 40
//! spotctl                                   # Interactive shell
//! ```

mod auth;
mod catalog;
mod interrupt;
mod player;
mod shell;

pub use auth::auth;
pub use auth::logout;
pub use catalog::devices;
pub use catalog::new_releases;
pub use catalog::playlists;
pub use catalog::search;
pub use interrupt::CtrlCGuard;
pub use player::current;
pub use player::next;
pub use player::play;
pub use player::previous;
pub use player::repeat;
pub use player::repeat_mode;
pub use player::toggle;
pub use player::volume;
pub use shell::ShellCommand;
pub use shell::ShellContext;
pub use shell::run as shell;

use crate::{Error, info, warning};

/// Prints an error returned by a command, with a hint when the user has to
/// authorize again.
pub fn report_error(e: &Error) {
    warning!("{}", e);
    if e.requires_reauthorization() {
        info!("Run `spotctl auth` to authorize again.");
    }
}
