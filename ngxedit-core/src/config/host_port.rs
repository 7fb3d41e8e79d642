//! `host:port` targets

use crate::error::{Error, Result};
use crate::config::Server;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Port assumed when a target or server omits one
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// A `host:port` pair, ordered by host and then port
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HostPort {
    host: String,
    port: u16,
}

impl HostPort {
    /// Target `host` on `port`
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Same host, different port
    pub fn with_port(&self, port: u16) -> Self {
        Self::new(self.host.clone(), port)
    }

    /// True if `server` is the virtual host `host` listening on `port`
    pub fn matches(&self, server: &Server) -> bool {
        server.name() == self.host && server.listen() == self.port
    }

    /// Parse `host[:port]`, also reporting whether the port was written out
    pub fn parse_explicit(s: &str) -> Result<(Self, bool)> {
        if s.is_empty() {
            return Err(Error::Malformed("empty host".to_string()));
        }

        // [v6]:port
        let (host, port) = if let Some(rest) = s.strip_prefix('[') {
            let end = rest
                .find(']')
                .ok_or_else(|| Error::Malformed(format!("unclosed '[' in host '{}'", s)))?;
            let host = &s[..end + 2];
            match &rest[end + 1..] {
                "" => (host, None),
                tail => match tail.strip_prefix(':') {
                    Some(port) => (host, Some(port)),
                    None => return Err(Error::Malformed(format!("invalid host '{}'", s))),
                },
            }
        } else {
            match s.rsplit_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (s, None),
            }
        };

        if host.is_empty() {
            return Err(Error::Malformed(format!("missing host in '{}'", s)));
        }

        match port {
            Some(port) => Ok((Self::new(host, parse_port(port)?), true)),
            None => Ok((Self::new(host, DEFAULT_HTTP_PORT), false)),
        }
    }
}

/// Parse a decimal port, rejecting forms that would not print back the same
pub(crate) fn parse_port(s: &str) -> Result<u16> {
    let port: u16 = s
        .parse()
        .map_err(|_| Error::Malformed(format!("invalid port '{}'", s)))?;
    if port.to_string() != s {
        return Err(Error::Malformed(format!("non-canonical port '{}'", s)));
    }
    Ok(port)
}

impl FromStr for HostPort {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_explicit(s).map(|(host_port, _)| host_port)
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
