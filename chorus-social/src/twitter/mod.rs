//! Twitter/X API integration surface.
//!
//! Submodules provide app-only and user-context authentication, the REST client, a pagination
//! cursor for list endpoints, the filtered-stream listener, and strongly typed
//! response models.
pub mod auth;
pub mod client;
pub mod cursor;
pub mod stream;
pub mod types;

pub use auth::{AccessToken, Credentials, TwitterAuthenticator, UserToken};
pub use client::TwitterApi;
pub use stream::{FileListener, StreamListener, StreamOutcome, TwitterStreamer};
pub use types::{Tweet, User};
