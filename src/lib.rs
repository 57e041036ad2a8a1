//! Library entrypoint for nightly-publish.
//!
//! The primary interface is the `nightly-publish` binary. The library exposes
//! the publish pipeline so integration tests can drive it against a local
//! server.

pub mod actions;
pub mod config;
pub mod github;
pub mod output;
pub mod publish;
pub mod retention;
pub mod template;
