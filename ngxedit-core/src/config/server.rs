//! `server` virtual hosts

use crate::config::{BLOCK_INDENT, BODY_INDENT, DEFAULT_HTTP_PORT, Location};
use serde::Serialize;
use std::fmt;

/// A virtual host, identified by `server_name` and `listen` port
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Server {
    name: String,
    listen: u16,
    locations: Vec<Location>,
}

impl Server {
    /// Create a server listening on port 80 with no locations
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            listen: DEFAULT_HTTP_PORT,
            locations: Vec::new(),
        }
    }

    /// Set the listen port
    pub fn with_listen(mut self, listen: u16) -> Self {
        self.listen = listen;
        self
    }

    /// Add a location, keeping the list sorted
    pub fn with_location(mut self, location: Location) -> Self {
        self.add_location(location);
        self
    }

    /// `server_name` value
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `listen` port
    pub fn listen(&self) -> u16 {
        self.listen
    }

    /// Key the document sorts and matches servers by
    pub fn key(&self) -> (&str, u16) {
        (&self.name, self.listen)
    }

    /// Locations sorted by name
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Insert a location, keeping the list sorted
    pub fn add_location(&mut self, location: Location) -> &mut Self {
        self.locations.push(location);
        self.locations.sort_by(|a, b| a.name().cmp(b.name()));
        self
    }

    /// First location called `name`
    pub fn location(&self, name: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.name() == name)
    }

    /// First location called `name`, for editing
    pub fn location_mut(&mut self, name: &str) -> Option<&mut Location> {
        self.locations.iter_mut().find(|l| l.name() == name)
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "server {{")?;
        writeln!(f, "{}server_name {};", BODY_INDENT, self.name)?;
        writeln!(f, "{}listen {};", BODY_INDENT, self.listen)?;
        for location in &self.locations {
            write!(f, "{}", location)?;
        }
        writeln!(f, "{}}}", BLOCK_INDENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(name: &str, target: &str) -> Location {
        Location::new(name, target.parse().unwrap())
    }

    #[test]
    fn test_render() {
        let server = Server::named("worker01").with_location(location("/", "http://localhost:8180/"));
        assert_eq!(
            server.to_string(),
            "server {\n\
             \x20       server_name worker01;\n\
             \x20       listen 80;\n\
             \x20       location / {\n\
             \x20           proxy_pass http://localhost:8180/;\n\
             \x20       }\n\
             \x20   }\n"
        );
    }

    #[test]
    fn test_locations_sorted() {
        let server = Server::named("s")
            .with_location(location("/foo", "http://a"))
            .with_location(location("/", "http://b"))
            .with_location(location("/bar", "http://c"));
        let names: Vec<&str> = server.locations().iter().map(|l| l.name()).collect();
        assert_eq!(names, ["/", "/bar", "/foo"]);
    }

    #[test]
    fn test_find_location() {
        let mut server = Server::named("s").with_location(location("/api", "http://api"));
        assert_eq!(server.location("/api").unwrap().proxy_pass().host(), "api");
        assert!(server.location("/missing").is_none());

        server
            .location_mut("/api")
            .unwrap()
            .set_after("proxy_read_timeout 60s;");
        assert_eq!(server.location("/api").unwrap().after(), "proxy_read_timeout 60s;");
    }
}
