//! Reading configs from files, URLs and streams

use crate::parser::{ParseError, parse_bytes};
use ngxedit_core::Document;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Where a config comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Local file, given as a path or a `file://` URL
    File(PathBuf),
    /// `http://` or `https://` URL
    Remote(String),
}

impl Locator {
    pub fn parse(s: &str) -> Self {
        if let Some(path) = s.strip_prefix("file://") {
            Locator::File(PathBuf::from(path))
        } else if s.starts_with("http://") || s.starts_with("https://") {
            Locator::Remote(s.to_string())
        } else {
            Locator::File(PathBuf::from(s))
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::File(path) => write!(f, "{}", path.display()),
            Locator::Remote(url) => write!(f, "{}", url),
        }
    }
}

/// Loading error
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("can't load config stream from '{locator}': {source}")]
    Io {
        locator: String,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("can't fetch config from '{locator}': {source}")]
    Remote {
        locator: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("remote config '{0}' needs the `remote` feature")]
    Unsupported(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

impl From<LoadError> for ngxedit_core::Error {
    fn from(e: LoadError) -> Self {
        match e {
            LoadError::Io { source, .. } => ngxedit_core::Error::Io(source),
            LoadError::Parse(e) => ngxedit_core::Error::Malformed(e.to_string()),
            other => ngxedit_core::Error::Io(std::io::Error::other(other.to_string())),
        }
    }
}

/// Read a whole stream and parse it
pub fn read(mut reader: impl Read) -> Result<Document, LoadError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|source| LoadError::Io {
            locator: "stream".to_string(),
            source,
        })?;
    Ok(parse_bytes(&bytes)?)
}

/// Read and parse the config a locator points to
pub fn read_from(locator: &Locator) -> Result<Document, LoadError> {
    tracing::debug!("loading config from {}", locator);
    let bytes = fetch(locator)?;
    Ok(parse_bytes(&bytes)?)
}

/// Read and parse a local file
pub fn read_file(path: impl AsRef<Path>) -> Result<Document, LoadError> {
    read_from(&Locator::File(path.as_ref().to_path_buf()))
}

/// Raw bytes behind a locator
pub fn fetch(locator: &Locator) -> Result<Vec<u8>, LoadError> {
    match locator {
        Locator::File(path) => std::fs::read(path).map_err(|source| LoadError::Io {
            locator: locator.to_string(),
            source,
        }),
        Locator::Remote(url) => fetch_remote(url),
    }
}

#[cfg(feature = "remote")]
fn fetch_remote(url: &str) -> Result<Vec<u8>, LoadError> {
    let remote = |source| LoadError::Remote {
        locator: url.to_string(),
        source,
    };
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(remote)?;
    let bytes = response.bytes().map_err(remote)?;
    Ok(bytes.to_vec())
}

#[cfg(not(feature = "remote"))]
fn fetch_remote(url: &str) -> Result<Vec<u8>, LoadError> {
    Err(LoadError::Unsupported(url.to_string()))
}

/// Write a document's text to `writer`
pub fn write_to(doc: &Document, mut writer: impl Write) -> std::io::Result<()> {
    write!(writer, "{}", doc)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_parse() {
        assert_eq!(
            Locator::parse("/etc/nginx/nginx.conf"),
            Locator::File(PathBuf::from("/etc/nginx/nginx.conf"))
        );
        assert_eq!(
            Locator::parse("file:///etc/nginx/nginx.conf"),
            Locator::File(PathBuf::from("/etc/nginx/nginx.conf"))
        );
        assert_eq!(
            Locator::parse("https://config.internal/nginx.conf"),
            Locator::Remote("https://config.internal/nginx.conf".to_string())
        );
    }

    #[test]
    fn test_read_stream() {
        let doc = read("upstream u {\n        server a:1;\n    }\n\n    }\n".as_bytes()).unwrap();
        assert_eq!(doc.upstream("u").unwrap().port_of("a").unwrap(), 1);
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_file("/definitely/not/here/nginx.conf").unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(err.to_string().contains("/definitely/not/here/nginx.conf"));

        let core: ngxedit_core::Error = err.into();
        assert!(matches!(core, ngxedit_core::Error::Io(_)));
    }

    #[test]
    fn test_parse_error_maps_to_malformed() {
        let err = read("upstream u {\n".as_bytes()).unwrap_err();
        let core: ngxedit_core::Error = err.into();
        assert!(matches!(core, ngxedit_core::Error::Malformed(_)));
    }

    #[test]
    fn test_write_to() {
        let mut doc = Document::new();
        doc.add_upstream(ngxedit_core::Upstream::named("u"));
        let mut out = Vec::new();
        write_to(&doc, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), doc.to_string());
    }
}
