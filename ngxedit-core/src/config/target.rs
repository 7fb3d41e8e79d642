//! `proxy_pass` targets

use crate::config::host_port::parse_port;
use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// URL-like target of a `proxy_pass`: `scheme://host[:port][path]`
///
/// `path` holds everything from the first `/`, `?` or `#` after the host.
///
/// Kept as parsed components rather than a normalized URL, so that
/// `http://backend` prints back without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyTarget {
    scheme: String,
    host: String,
    port: Option<u16>,
    path: String,
}

impl ProxyTarget {
    /// `scheme://host` with no port or path
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            port: None,
            path: String::new(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl FromStr for ProxyTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| Error::Malformed(format!("proxy target '{}' has no scheme", s)))?;
        if scheme.is_empty() {
            return Err(Error::Malformed(format!("proxy target '{}' has no scheme", s)));
        }

        // Path, query or fragment; all of it is printed back as written
        let (authority, path) = match rest.find(|c: char| matches!(c, '/' | '?' | '#')) {
            Some(idx) => rest.split_at(idx),
            None => (rest, ""),
        };

        let (host, port) = if authority.starts_with('[') {
            match authority.find("]:") {
                Some(idx) => (&authority[..=idx], Some(&authority[idx + 2..])),
                None => (authority, None),
            }
        } else {
            match authority.rsplit_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (authority, None),
            }
        };

        if host.is_empty() {
            return Err(Error::Malformed(format!("proxy target '{}' has no host", s)));
        }

        Ok(Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port: port.map(parse_port).transpose()?,
            path: path.to_string(),
        })
    }
}

impl fmt::Display for ProxyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        f.write_str(&self.path)
    }
}

impl Serialize for ProxyTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
