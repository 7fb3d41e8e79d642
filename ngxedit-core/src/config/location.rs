//! `location` routing rules

use crate::config::{BODY_INDENT, LOCATION_BODY_INDENT, ProxyTarget, write_fragment};
use serde::Serialize;
use std::fmt;

/// A path pattern proxied to a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    name: String,
    before: String,
    after: String,
    proxy_pass: ProxyTarget,
}

impl Location {
    /// Location `name` proxied to `proxy_pass`, with no extra text
    pub fn new(name: impl Into<String>, proxy_pass: ProxyTarget) -> Self {
        Self {
            name: name.into(),
            before: String::new(),
            after: String::new(),
            proxy_pass,
        }
    }

    /// Set the text ahead of `proxy_pass`
    pub fn with_before(mut self, before: impl Into<String>) -> Self {
        self.before = before.into();
        self
    }

    /// Set the text behind `proxy_pass`
    pub fn with_after(mut self, after: impl Into<String>) -> Self {
        self.after = after.into();
        self
    }

    /// Path pattern, e.g. `/` or `~ \.php$`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Opaque text ahead of `proxy_pass`
    pub fn before(&self) -> &str {
        &self.before
    }

    /// Replace the opaque text ahead of `proxy_pass`
    pub fn set_before(&mut self, before: impl Into<String>) {
        self.before = before.into();
    }

    /// Opaque text behind `proxy_pass`
    pub fn after(&self) -> &str {
        &self.after
    }

    /// Replace the opaque text behind `proxy_pass`
    pub fn set_after(&mut self, after: impl Into<String>) {
        self.after = after.into();
    }

    /// Where requests are proxied to
    pub fn proxy_pass(&self) -> &ProxyTarget {
        &self.proxy_pass
    }

    /// Point the location at another target
    pub fn set_proxy_pass(&mut self, proxy_pass: ProxyTarget) {
        self.proxy_pass = proxy_pass;
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}location {} {{", BODY_INDENT, self.name)?;
        write_fragment(f, LOCATION_BODY_INDENT, &self.before)?;
        writeln!(f, "{}proxy_pass {};", LOCATION_BODY_INDENT, self.proxy_pass)?;
        write_fragment(f, LOCATION_BODY_INDENT, &self.after)?;
        writeln!(f, "{}}}", BODY_INDENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_with_fragments() {
        let location = Location::new("/", "http://backend".parse().unwrap())
            .with_before("# routed to the pool")
            .with_after(
                "proxy_set_header Host $host;\n            proxy_set_header X-Real-IP $remote_addr;",
            );
        assert_eq!(
            location.to_string(),
            "        location / {\n\
             \x20           # routed to the pool\n\
             \x20           proxy_pass http://backend;\n\
             \x20           proxy_set_header Host $host;\n\
             \x20           proxy_set_header X-Real-IP $remote_addr;\n\
             \x20       }\n"
        );
    }

    #[test]
    fn test_set_proxy_pass() {
        let mut location = Location::new("/foo", "http://backend/foo".parse().unwrap());
        location.set_proxy_pass("http://localhost:8180/".parse().unwrap());
        assert_eq!(
            location.to_string(),
            "        location /foo {\n            proxy_pass http://localhost:8180/;\n        }\n"
        );
    }
}
