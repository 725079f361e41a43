//! Driven adapters: persistence, identity providers, and the image host.

pub mod image_host;
pub mod oauth;
pub mod persistence;
