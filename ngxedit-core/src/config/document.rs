//! Whole-file document

use crate::config::{BLOCK_SEPARATOR, HostPort, Server, Upstream};
use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Root of a parsed config
///
/// Upstreams are kept sorted by name and servers by `(name, listen)` after
/// every insert. Adding an entry whose key already exists keeps both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    leading_text: String,
    trailing_text: String,
    upstreams: Vec<Upstream>,
    servers: Vec<Server>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty `http { }` document
    pub fn new() -> Self {
        Self::with_text("http {\n    ", "}\n")
    }

    /// Empty document framed by the given raw text
    pub fn with_text(leading_text: impl Into<String>, trailing_text: impl Into<String>) -> Self {
        Self {
            leading_text: leading_text.into(),
            trailing_text: trailing_text.into(),
            upstreams: Vec::new(),
            servers: Vec::new(),
        }
    }

    /// Raw text ahead of the first block
    pub fn leading_text(&self) -> &str {
        &self.leading_text
    }

    /// Replace the text ahead of the first block
    pub fn set_leading_text(&mut self, text: impl Into<String>) {
        self.leading_text = text.into();
    }

    /// Raw text behind the last block
    pub fn trailing_text(&self) -> &str {
        &self.trailing_text
    }

    /// Replace the text behind the last block
    pub fn set_trailing_text(&mut self, text: impl Into<String>) {
        self.trailing_text = text.into();
    }

    // ========================================
    // Upstreams
    // ========================================

    /// Upstreams sorted by name
    pub fn upstreams(&self) -> &[Upstream] {
        &self.upstreams
    }

    /// Insert an upstream, keeping the list sorted
    pub fn add_upstream(&mut self, upstream: Upstream) -> &mut Self {
        tracing::debug!("add upstream {}", upstream.name());
        self.upstreams.push(upstream);
        self.upstreams.sort_by(|a, b| a.name().cmp(b.name()));
        self
    }

    /// Remove every upstream called `name`, returning how many went
    pub fn remove_upstream(&mut self, name: &str) -> usize {
        let before = self.upstreams.len();
        self.upstreams.retain(|u| u.name() != name);
        before - self.upstreams.len()
    }

    /// First upstream called `name`
    pub fn upstream(&self, name: &str) -> Option<&Upstream> {
        self.upstreams.iter().find(|u| u.name() == name)
    }

    /// First upstream called `name`, for editing
    pub fn upstream_mut(&mut self, name: &str) -> Option<&mut Upstream> {
        self.upstreams.iter_mut().find(|u| u.name() == name)
    }

    /// Like [`Document::upstream_mut`], but absent names are an error
    pub fn require_upstream_mut(&mut self, name: &str) -> Result<&mut Upstream> {
        self.upstream_mut(name)
            .ok_or_else(|| Error::NotFound(format!("upstream {}", name)))
    }

    // ========================================
    // Servers
    // ========================================

    /// Servers sorted by name, then listen port
    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    /// Insert a server, keeping the list sorted
    pub fn add_server(&mut self, server: Server) -> &mut Self {
        tracing::debug!("add server {}:{}", server.name(), server.listen());
        self.servers.push(server);
        self.servers.sort_by(|a, b| a.key().cmp(&b.key()));
        self
    }

    /// Remove every server whose name and listen port match `host_port`
    pub fn remove_server(&mut self, host_port: &HostPort) -> usize {
        let before = self.servers.len();
        self.servers.retain(|s| !host_port.matches(s));
        before - self.servers.len()
    }

    /// Server with exactly this name and listen port
    pub fn server(&self, name: &str, listen: u16) -> Option<&Server> {
        self.servers.iter().find(|s| s.key() == (name, listen))
    }

    /// Server with exactly this name and listen port, for editing
    pub fn server_mut(&mut self, name: &str, listen: u16) -> Option<&mut Server> {
        self.servers.iter_mut().find(|s| s.key() == (name, listen))
    }

    /// Like [`Document::server_mut`], but absent servers are an error
    pub fn require_server_mut(&mut self, name: &str, listen: u16) -> Result<&mut Server> {
        self.server_mut(name, listen)
            .ok_or_else(|| Error::NotFound(format!("server {}:{}", name, listen)))
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.leading_text)?;
        for upstream in &self.upstreams {
            write!(f, "{}{}", upstream, BLOCK_SEPARATOR)?;
        }
        for (i, server) in self.servers.iter().enumerate() {
            if i > 0 {
                f.write_str(BLOCK_SEPARATOR)?;
            }
            write!(f, "{}", server)?;
        }
        f.write_str(&self.trailing_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Location;

    fn server(name: &str, listen: u16) -> Server {
        Server::named(name)
            .with_listen(listen)
            .with_location(Location::new("/", "http://backend".parse().unwrap()))
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(Document::new().to_string(), "http {\n    }\n");
    }

    #[test]
    fn test_separator_follows_every_upstream() {
        let mut doc = Document::new();
        doc.add_upstream(Upstream::named("u").with_host_port("a:1".parse().unwrap()));
        assert_eq!(
            doc.to_string(),
            "http {\n    upstream u {\n        server a:1;\n    }\n\n    }\n"
        );
    }

    #[test]
    fn test_blocks_are_separated() {
        let mut doc = Document::new();
        doc.add_server(Server::named("b"));
        doc.add_upstream(Upstream::named("pool").with_host_port("a:1".parse().unwrap()));
        doc.add_server(Server::named("a"));

        assert_eq!(
            doc.to_string(),
            "http {\n    \
             upstream pool {\n        server a:1;\n    }\n\
             \n    \
             server {\n        server_name a;\n        listen 80;\n    }\n\
             \n    \
             server {\n        server_name b;\n        listen 80;\n    }\n\
             }\n"
        );
    }

    #[test]
    fn test_upstreams_sorted_and_duplicates_kept() {
        let mut doc = Document::new();
        doc.add_upstream(Upstream::named("zeta"));
        doc.add_upstream(Upstream::named("alpha"));
        doc.add_upstream(Upstream::named("alpha").with_method("ip_hash"));

        let names: Vec<&str> = doc.upstreams().iter().map(|u| u.name()).collect();
        assert_eq!(names, ["alpha", "alpha", "zeta"]);
        assert_eq!(doc.upstream("alpha").unwrap().method(), None);

        assert_eq!(doc.remove_upstream("alpha"), 2);
        assert_eq!(doc.remove_upstream("alpha"), 0);
        assert_eq!(doc.upstreams().len(), 1);
    }

    #[test]
    fn test_servers_sorted_by_name_then_port() {
        let mut doc = Document::new();
        doc.add_server(server("worker02", 80));
        doc.add_server(server("worker01", 8080));
        doc.add_server(server("worker01", 80));

        let keys: Vec<(&str, u16)> = doc.servers().iter().map(|s| s.key()).collect();
        assert_eq!(keys, [("worker01", 80), ("worker01", 8080), ("worker02", 80)]);
    }

    #[test]
    fn test_remove_server_matches_name_and_port() {
        let mut doc = Document::new();
        doc.add_server(server("worker01", 80));
        doc.add_server(server("worker01", 80));
        doc.add_server(server("worker01", 8080));
        doc.add_server(server("worker02", 80));

        assert_eq!(doc.remove_server(&HostPort::new("worker01", 80)), 2);

        let keys: Vec<(&str, u16)> = doc.servers().iter().map(|s| s.key()).collect();
        assert_eq!(keys, [("worker01", 8080), ("worker02", 80)]);
        assert_eq!(doc.remove_server(&HostPort::new("worker01", 80)), 0);
    }

    #[test]
    fn test_find_server() {
        let mut doc = Document::new();
        doc.add_server(server("worker01", 8080));
        assert!(doc.server("worker01", 8080).is_some());
        assert!(doc.server("worker01", 80).is_none());
        assert!(doc.require_server_mut("worker01", 80).unwrap_err().is_not_found());

        doc.require_server_mut("worker01", 8080)
            .unwrap()
            .add_location(Location::new("/api", "http://api".parse().unwrap()));
        assert_eq!(doc.server("worker01", 8080).unwrap().locations().len(), 2);
    }

    #[test]
    fn test_require_upstream() {
        let mut doc = Document::new();
        assert!(doc.require_upstream_mut("backend").unwrap_err().is_not_found());
        doc.add_upstream(Upstream::named("backend"));
        doc.require_upstream_mut("backend")
            .unwrap()
            .add_host_port("localhost:8180".parse().unwrap());
        assert_eq!(doc.upstream("backend").unwrap().port_of("localhost").unwrap(), 8180);
    }

    #[test]
    fn test_serialize_json() {
        let mut doc = Document::new();
        doc.add_upstream(Upstream::named("backend").with_host_port("a:1".parse().unwrap()));
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["upstreams"][0]["name"], "backend");
        assert_eq!(json["upstreams"][0]["host_ports"][0]["port"], 1);
    }
}
