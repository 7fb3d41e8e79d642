//! `upstream` load-balancer pools

use crate::config::{BLOCK_INDENT, BODY_INDENT, HostPort, write_fragment};
use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Directives recognized as an upstream's load-balancing method
pub const LOAD_BALANCING_METHODS: &[&str] =
    &["least_conn", "ip_hash", "hash", "random", "least_time", "ntlm"];

/// A named pool of backend targets
///
/// See <https://nginx.org/en/docs/http/ngx_http_upstream_module.html>.
/// `before` and `after` hold the raw text found ahead of the method and
/// behind the last `server` line; they are re-emitted untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Upstream {
    name: String,
    method: Option<String>,
    before: String,
    after: String,
    host_ports: Vec<HostPort>,
}

impl Upstream {
    /// Create an empty upstream
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: None,
            before: String::new(),
            after: String::new(),
            host_ports: Vec::new(),
        }
    }

    /// Set the load-balancing directive, without its `;`
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Set the text ahead of the method and targets
    pub fn with_before(mut self, before: impl Into<String>) -> Self {
        self.before = before.into();
        self
    }

    /// Set the text behind the last target
    pub fn with_after(mut self, after: impl Into<String>) -> Self {
        self.after = after.into();
        self
    }

    /// Add a target, keeping the list sorted
    pub fn with_host_port(mut self, host_port: HostPort) -> Self {
        self.add_host_port(host_port);
        self
    }

    /// Pool name; fixed once created
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Load-balancing directive as written, e.g. `least_conn`
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Replace or clear the load-balancing directive
    pub fn set_method(&mut self, method: Option<String>) {
        self.method = method;
    }

    /// Opaque text ahead of the method and targets
    pub fn before(&self) -> &str {
        &self.before
    }

    /// Replace the opaque text ahead of the method and targets
    pub fn set_before(&mut self, before: impl Into<String>) {
        self.before = before.into();
    }

    /// Opaque text behind the last target
    pub fn after(&self) -> &str {
        &self.after
    }

    /// Replace the opaque text behind the last target
    pub fn set_after(&mut self, after: impl Into<String>) {
        self.after = after.into();
    }

    /// Targets in sorted order
    pub fn host_ports(&self) -> &[HostPort] {
        &self.host_ports
    }

    /// True if the pool has no targets
    pub fn is_empty(&self) -> bool {
        self.host_ports.is_empty()
    }

    /// True if some target is on `host`
    pub fn has_host(&self, host: &str) -> bool {
        self.host_ports.iter().any(|hp| hp.host() == host)
    }

    /// Insert a target, keeping the list sorted
    pub fn add_host_port(&mut self, host_port: HostPort) -> &mut Self {
        tracing::debug!("upstream {}: add {}", self.name, host_port);
        self.host_ports.push(host_port);
        self.host_ports.sort();
        self
    }

    /// Remove every target on `host`; absent hosts are ignored
    pub fn remove_host(&mut self, host: &str) {
        self.host_ports.retain(|hp| hp.host() != host);
    }

    /// Replace whatever target `host_port`'s host had, or add it
    pub fn update_host_port(&mut self, host_port: HostPort) {
        self.remove_host(host_port.host());
        self.add_host_port(host_port);
    }

    /// Move the exact target `host_port` to `port`
    ///
    /// Only an entry equal to `host_port` (host and current port) qualifies;
    /// otherwise the list is left as is and `NotFound` is returned.
    pub fn set_port(&mut self, host_port: &HostPort, port: u16) -> Result<()> {
        let index = self
            .host_ports
            .iter()
            .position(|hp| hp == host_port)
            .ok_or_else(|| {
                Error::NotFound(format!("{} in upstream {}", host_port, self.name))
            })?;
        self.host_ports[index] = host_port.with_port(port);
        self.host_ports.sort();
        Ok(())
    }

    /// Port of the first target on `host`
    pub fn port_of(&self, host: &str) -> Result<u16> {
        self.host_ports
            .iter()
            .find(|hp| hp.host() == host)
            .map(HostPort::port)
            .ok_or_else(|| Error::NotFound(format!("no server for {} in upstream {}", host, self.name)))
    }

    /// Position of `host` in the sorted target list
    pub fn index_of(&self, host: &str) -> Result<usize> {
        self.host_ports
            .iter()
            .position(|hp| hp.host() == host)
            .ok_or_else(|| Error::NotFound(format!("host [{}] not in upstream {}", host, self.name)))
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "upstream {} {{", self.name)?;
        write_fragment(f, BODY_INDENT, &self.before)?;
        if let Some(method) = &self.method {
            write!(f, "{}{};\n\n", BODY_INDENT, method)?;
        }
        for host_port in &self.host_ports {
            writeln!(f, "{}server {};", BODY_INDENT, host_port)?;
        }
        write_fragment(f, BODY_INDENT, &self.after)?;
        writeln!(f, "{}}}", BLOCK_INDENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hp(s: &str) -> HostPort {
        s.parse().unwrap()
    }

    fn backend() -> Upstream {
        Upstream::named("backend")
            .with_method("least_conn")
            .with_before("# lb-before-comment")
            .with_host_port(hp("localhost:8180"))
            .with_host_port(hp("localhost:8280"))
            .with_after("# lb-after-comment")
    }

    #[test]
    fn test_render() {
        assert_eq!(
            backend().to_string(),
            "upstream backend {\n\
             \x20       # lb-before-comment\n\
             \x20       least_conn;\n\
             \n\
             \x20       server localhost:8180;\n\
             \x20       server localhost:8280;\n\
             \x20       # lb-after-comment\n\
             \x20   }\n"
        );
    }

    #[test]
    fn test_render_bare() {
        let upstream = Upstream::named("app").with_host_port(hp("10.0.0.1:9000"));
        assert_eq!(
            upstream.to_string(),
            "upstream app {\n        server 10.0.0.1:9000;\n    }\n"
        );
    }

    #[test]
    fn test_render_fragments_starting_with_whitespace() {
        let upstream = Upstream::named("u")
            .with_before("\n        # spare\n")
            .with_host_port(hp("a:1"))
            .with_after("\n");
        assert_eq!(
            upstream.to_string(),
            "upstream u {\n\n        # spare\n        server a:1;\n\n    }\n"
        );

        let upstream = Upstream::named("u").with_after("  # odd");
        assert_eq!(upstream.to_string(), "upstream u {\n  # odd\n    }\n");
    }

    #[test]
    fn test_add_keeps_sorted() {
        let mut upstream = Upstream::named("u");
        upstream.add_host_port(hp("c:1"));
        upstream.add_host_port(hp("a:2"));
        upstream.add_host_port(hp("b:3"));
        let hosts: Vec<&str> = upstream.host_ports().iter().map(|hp| hp.host()).collect();
        assert_eq!(hosts, ["a", "b", "c"]);
    }

    #[test]
    fn test_add_then_remove_is_identity() {
        let mut upstream = backend();
        let before = upstream.to_string();
        upstream.add_host_port(hp("worker03:8380"));
        assert_ne!(upstream.to_string(), before);
        upstream.remove_host("worker03");
        assert_eq!(upstream.to_string(), before);
    }

    #[test]
    fn test_remove_absent_host_is_noop() {
        let mut upstream = backend();
        upstream.remove_host("nowhere");
        assert_eq!(upstream, backend());
    }

    #[test]
    fn test_update_host_port() {
        let mut upstream = Upstream::named("u")
            .with_host_port(hp("a:1"))
            .with_host_port(hp("b:2"));
        upstream.update_host_port(hp("a:5"));
        upstream.update_host_port(hp("c:3"));
        assert_eq!(upstream.port_of("a").unwrap(), 5);
        assert_eq!(upstream.port_of("c").unwrap(), 3);
        assert_eq!(upstream.host_ports().len(), 3);
    }

    #[test]
    fn test_set_port() {
        let mut upstream = backend();
        upstream.set_port(&hp("localhost:8180"), 9000).unwrap();
        let rendered: Vec<String> = upstream.host_ports().iter().map(|hp| hp.to_string()).collect();
        assert_eq!(rendered, ["localhost:8280", "localhost:9000"]);
    }

    #[test]
    fn test_set_port_requires_exact_match() {
        let mut upstream = backend();
        let err = upstream.set_port(&hp("localhost:1234"), 9000).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(upstream.host_ports(), backend().host_ports());

        let err = upstream.set_port(&hp("elsewhere:8180"), 9000).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(upstream, backend());
    }

    #[test]
    fn test_port_of_and_index_of() {
        let upstream = Upstream::named("u")
            .with_host_port(hp("b:2"))
            .with_host_port(hp("a:1"));
        assert_eq!(upstream.port_of("b").unwrap(), 2);
        assert_eq!(upstream.index_of("a").unwrap(), 0);
        assert_eq!(upstream.index_of("b").unwrap(), 1);
        assert!(upstream.port_of("z").unwrap_err().is_not_found());
        assert!(upstream.index_of("z").unwrap_err().is_not_found());
    }

    #[test]
    fn test_has_host_and_is_empty() {
        let mut upstream = Upstream::named("u");
        assert!(upstream.is_empty());
        upstream.add_host_port(hp("a:1"));
        assert!(upstream.has_host("a"));
        assert!(!upstream.has_host("b"));
        assert!(!upstream.is_empty());
    }
}
