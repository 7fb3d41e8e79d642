//! Configuration document model
//!
//! These types represent one parsed nginx config: the structured parts the
//! caller may edit plus the opaque text around them. Every `Display` impl
//! re-emits the fixed layout below; the parser only accepts text that
//! renders back to the same bytes.

use std::fmt;

mod document;
mod host_port;
mod location;
mod server;
mod target;
mod upstream;

pub use document::Document;
pub use host_port::{DEFAULT_HTTP_PORT, HostPort};
pub use location::Location;
pub use server::Server;
pub use target::ProxyTarget;
pub use upstream::{LOAD_BALANCING_METHODS, Upstream};

/// Indentation of a top-level block's closing brace
pub const BLOCK_INDENT: &str = "    ";

/// Indentation of directives inside `upstream` and `server`
pub const BODY_INDENT: &str = "        ";

/// Indentation of directives inside `location`
pub const LOCATION_BODY_INDENT: &str = "            ";

/// Text emitted after every upstream and between two servers
pub const BLOCK_SEPARATOR: &str = "\n    ";

/// Write an opaque `before`/`after` fragment whose first line sits at `indent`
///
/// A fragment starting with a non-blank character is stored without its
/// first line's indentation and line break, and gets both back here. One
/// that starts with whitespace (a blank first line, or a line indented
/// differently from the layout) is written as is, plus a line break if it
/// lacks one.
pub(crate) fn write_fragment(
    f: &mut fmt::Formatter<'_>,
    indent: &str,
    fragment: &str,
) -> fmt::Result {
    match fragment.chars().next() {
        None => Ok(()),
        Some(c) if c.is_whitespace() => {
            f.write_str(fragment)?;
            if fragment.ends_with('\n') {
                Ok(())
            } else {
                f.write_str("\n")
            }
        }
        Some(_) => writeln!(f, "{}{}", indent, fragment),
    }
}
