//! # API Module
//!
//! HTTP endpoints of the short-lived local server that receives the OAuth
//! redirect during interactive authorization.
//!
//! ## Endpoints
//!
//! - [`callback`] - Receives `code`, `state` (and `error`) from the accounts
//!   service and forwards them to the waiting authorization prompt. It does
//!   not verify anything itself: state verification and the code exchange
//!   happen in [`crate::spotify::auth::TokenManager`].
//! - [`health`] - Reports that the server is up, with name and version.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use spotctl::api::{callback, health};
//!
//! let app = Router::new()
//!     .route("/callback", get(callback))
//!     .route("/health", get(health));
//! ```

mod callback;
mod health;

pub use callback::CallbackSender;
pub use callback::callback;
pub use health::health;
