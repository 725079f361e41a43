//! HTTP driving adapter built on actix-web.
//!
//! Handlers stay thin: they resolve the session identity, delegate to a
//! driving port on [`state::HttpState`], and serialise the result. Error
//! mapping to HTTP statuses lives in [`error`].

pub mod admin;
pub mod error;
pub mod lobbies;
pub mod session;
pub mod state;
pub mod teams;
#[cfg(test)]
pub mod test_utils;
pub mod users;

pub use error::ApiResult;
