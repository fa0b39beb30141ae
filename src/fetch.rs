//! Retrieval of values referenced with `attr:< URL`.
//!
//! The parser only calls a fetcher for URLs whose scheme is on its allowlist.

use crate::error::BoxError;
use url::Url;

/// Capability to load the content behind a URL.
pub trait ResourceFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, BoxError>;
}

impl<F> ResourceFetcher for F
where
    F: Fn(&Url) -> Result<Vec<u8>, BoxError>,
{
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, BoxError> {
        self(url)
    }
}

/// Reads `file:` URLs from the local filesystem. Any other scheme is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

impl ResourceFetcher for FileFetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>, BoxError> {
        if url.scheme() != "file" {
            return Err(format!("no fetcher for scheme {}", url.scheme()).into());
        }
        let path = url
            .to_file_path()
            .map_err(|_| format!("not a local file URL: {}", url))?;
        Ok(std::fs::read(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_fetcher_reads_local_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"\x00photo").unwrap();
        let url = Url::from_file_path(f.path()).unwrap();
        assert_eq!(FileFetcher.fetch(&url).unwrap(), b"\x00photo");
    }

    #[test]
    fn file_fetcher_rejects_other_schemes() {
        let url = Url::parse("http://example.com/x").unwrap();
        assert!(FileFetcher.fetch(&url).is_err());
    }

    #[test]
    fn closures_are_fetchers() {
        let fetcher = |_: &Url| -> Result<Vec<u8>, BoxError> { Ok(b"inline".to_vec()) };
        let url = Url::parse("mem://x").unwrap();
        assert_eq!(fetcher.fetch(&url).unwrap(), b"inline");
    }
}
