//! Resource loading for documents, stylesheets and images.
//!
//! [`load`] fetches a `file:`, `http:` or `https:` URL synchronously and
//! hands the bytes to a callback exactly once. Anything else is an error and
//! the callback never runs.

use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

#[derive(Clone, Debug)]
pub struct LoadConfig {
    pub timeout: Duration,
    pub user_agent: String,
    /// Bodies longer than this are cut off.
    pub max_bytes: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            user_agent: "render-engine/0.1".to_string(),
            max_bytes: 16 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unsupported URL scheme {0:?}")]
    UnsupportedScheme(String),
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Parses `input`, relative to `base` when given. Without a base, an
/// absolute filesystem path is accepted as a `file:` URL.
pub fn resolve(input: &str, base: Option<&Url>) -> Result<Url, LoadError> {
    let invalid = |reason: String| LoadError::InvalidUrl {
        url: input.to_string(),
        reason,
    };
    match Url::options().base_url(base).parse(input) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) if input.starts_with('/') => {
            Url::from_file_path(input).map_err(|()| invalid("not an absolute path".to_string()))
        }
        Err(err) => Err(invalid(err.to_string())),
    }
}

/// Loads `url` with the default configuration.
pub fn load(url: &str, callback: impl FnOnce(&[u8])) -> Result<(), LoadError> {
    let url = resolve(url, None)?;
    load_url(&url, &LoadConfig::default(), callback)
}

pub fn load_url(
    url: &Url,
    config: &LoadConfig,
    callback: impl FnOnce(&[u8]),
) -> Result<(), LoadError> {
    let result = match url.scheme() {
        "file" => load_file(url, config),
        "http" | "https" => load_http(url, config),
        other => Err(LoadError::UnsupportedScheme(other.to_string())),
    };
    match result {
        Ok(bytes) => {
            log::debug!(target: "net", "loaded {url}: {} bytes", bytes.len());
            callback(&bytes);
            Ok(())
        }
        Err(err) => {
            log::warn!(target: "net", "{err}");
            Err(err)
        }
    }
}

fn load_file(url: &Url, config: &LoadConfig) -> Result<Vec<u8>, LoadError> {
    let path = url.to_file_path().map_err(|()| LoadError::InvalidUrl {
        url: url.to_string(),
        reason: "not a local file path".to_string(),
    })?;
    let io_error = |source| LoadError::Io {
        path: path.clone(),
        source,
    };
    let file = fs::File::open(&path).map_err(io_error)?;
    let mut bytes = Vec::new();
    file.take(config.max_bytes)
        .read_to_end(&mut bytes)
        .map_err(io_error)?;
    Ok(bytes)
}

fn load_http(url: &Url, config: &LoadConfig) -> Result<Vec<u8>, LoadError> {
    let http_error = |source| LoadError::Http {
        url: url.to_string(),
        source,
    };
    let client = reqwest::blocking::Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(http_error)?;
    let response = client
        .get(url.as_str())
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(http_error)?;
    if let Some(content_type) = response.headers().get(reqwest::header::CONTENT_TYPE) {
        log::trace!(target: "net", "{url}: content-type {content_type:?}");
    }

    let mut bytes = Vec::new();
    response
        .take(config.max_bytes)
        .read_to_end(&mut bytes)
        .map_err(|source| LoadError::Io {
            path: PathBuf::from(url.path()),
            source,
        })?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        init_logging();
        let path = std::env::temp_dir().join(format!("net-test-{}-{name}", std::process::id()));
        fs::write(&path, contents).expect("write temp file");
        path
    }

    #[test]
    fn file_urls_invoke_the_callback_once() {
        let path = temp_file("page.html", b"<p>hi</p>");
        let url = Url::from_file_path(&path).expect("absolute path");
        let mut calls = Vec::new();
        load(url.as_str(), |bytes| calls.push(bytes.to_vec())).expect("loads");
        assert_eq!(calls, vec![b"<p>hi</p>".to_vec()]);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn absolute_paths_are_file_urls() {
        let path = temp_file("plain.css", b"p {}");
        let mut loaded = None;
        load(path.to_str().expect("utf-8 path"), |bytes| {
            loaded = Some(bytes.len())
        })
        .expect("loads");
        assert_eq!(loaded, Some(4));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn bodies_are_capped() {
        let path = temp_file("big.txt", &[b'x'; 100]);
        let url = Url::from_file_path(&path).expect("absolute path");
        let config = LoadConfig {
            max_bytes: 10,
            ..LoadConfig::default()
        };
        let mut len = 0;
        load_url(&url, &config, |bytes| len = bytes.len()).expect("loads");
        assert_eq!(len, 10);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn unsupported_schemes_skip_the_callback() {
        init_logging();
        let mut called = false;
        let err = load("ftp://example.com/file", |_| called = true).unwrap_err();
        assert!(
            matches!(err, LoadError::UnsupportedScheme(ref s) if s == "ftp"),
            "{err:?}"
        );
        assert!(!called);
    }

    #[test]
    fn missing_files_are_io_errors() {
        let err = load("file:///definitely/not/here.html", |_| {}).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }), "{err:?}");
    }

    #[test]
    fn bad_urls_are_rejected() {
        let err = load("http://[::1", |_| {}).unwrap_err();
        assert!(matches!(err, LoadError::InvalidUrl { .. }), "{err:?}");
        assert!(matches!(
            resolve("page.html", None),
            Err(LoadError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn relative_references_resolve_against_the_base() {
        let base = Url::parse("https://example.com/docs/index.html").expect("valid");
        let url = resolve("../img/a.png", Some(&base)).expect("resolves");
        assert_eq!(url.as_str(), "https://example.com/img/a.png");
    }
}
