//! ngxedit Configuration Parser
//!
//! This crate reads nginx configs into an editable [`Document`] and writes
//! them back. Text the parser does not model (comments, `proxy_set_header`
//! and other directives inside upstreams and locations, everything around
//! the `upstream`/`server` blocks) is carried along verbatim. Whatever
//! `parse` accepts survives `parse` + `format` byte for byte; text whose
//! structured lines would come back different is rejected instead.
//!
//! # Example
//!
//! ```rust
//! use ngxedit_config::{format, parse};
//! use ngxedit_core::HostPort;
//!
//! let source = "http {
//!     upstream backend {
//!         keepalive 16;
//!         server localhost:8180;
//!     }
//!
//!     include sites/*.conf;
//! }
//! ";
//!
//! let mut doc = parse(source).unwrap();
//! assert_eq!(format(&doc), source);
//!
//! doc.upstream_mut("backend")
//!     .unwrap()
//!     .add_host_port(HostPort::new("localhost", 8280));
//! assert!(format(&doc).contains("server localhost:8280;"));
//! ```

pub mod loader;
pub mod parser;

pub use loader::{LoadError, Locator, fetch, read, read_file, read_from, write_to};
pub use parser::{ParseError, Parser, parse, parse_bytes, render};

pub use ngxedit_core::Document;

/// Render a document back to config text
pub fn format(doc: &Document) -> String {
    doc.to_string()
}
