//! ngxedit Core Library
//!
//! This crate provides the in-memory model of an nginx reverse-proxy config:
//! upstreams with their targets, servers with their locations, and the opaque
//! text fragments that let a parsed file render back byte-for-byte.
//!
//! Rendering lives in each entity's `Display` impl; the parser is in
//! `ngxedit-config`.

pub mod config;
pub mod error;

pub use config::{Document, HostPort, Location, ProxyTarget, Server, Upstream};
pub use error::{Error, Result};

/// ngxedit version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
