//! CHP incident feed client.
//!
//! Provides blocking access to the dispatch-log XML, either over HTTP(S) or
//! from a local file (handy for replaying a saved feed).
//! Uses reqwest with rustls for TLS.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, instrument};

use crate::errors::TrafficError;
use crate::feed::{FeedEntry, FeedSelector, parse_feed};

/// Default request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// User agent string for feed requests.
const USER_AGENT: &str = concat!("chptail/", env!("CARGO_PKG_VERSION"));

/// Public CHP Sacramento-area incident feed.
pub const DEFAULT_FEED_URL: &str = "https://media.chp.ca.gov/sa_xml/sa.xml";

/// Where to read the feed document from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    /// HTTP(S) URL
    Url(String),
    /// Local file
    File(PathBuf),
}

impl Default for FeedSource {
    fn default() -> Self {
        Self::Url(DEFAULT_FEED_URL.to_string())
    }
}

impl std::str::FromStr for FeedSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("feed source must not be empty".into());
        }

        let lower = s.to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(Self::Url(s.to_string()))
        } else {
            Ok(Self::File(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Client for the CHP incident feed.
pub struct FeedClient {
    client: Client,
}

impl FeedClient {
    /// Create a new feed client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new() -> Result<Self, TrafficError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    /// Fetch the raw feed document.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server answers with a
    /// non-success status, or the file cannot be read.
    #[instrument(skip(self), fields(source = %source))]
    pub fn fetch(&self, source: &FeedSource) -> Result<String, TrafficError> {
        let body = match source {
            FeedSource::Url(url) => {
                debug!("fetching feed from {}", url);

                let response = self.client.get(url).send()?;

                // Check status before reading the body
                let status = response.status();
                if !status.is_success() {
                    let body = response.text().unwrap_or_default();
                    return Err(TrafficError::Api {
                        status: status.as_u16(),
                        message: body,
                    });
                }

                response.text()?
            }
            FeedSource::File(path) => {
                debug!("reading feed from {}", path.display());
                std::fs::read_to_string(path)?
            }
        };

        debug!("fetched {} bytes", body.len());
        Ok(body)
    }

    /// Fetch the feed document and extract the selected entries.
    ///
    /// # Errors
    ///
    /// Returns an error if fetching fails or the document is not valid XML.
    pub fn fetch_entries(
        &self,
        source: &FeedSource,
        selector: &FeedSelector,
    ) -> Result<Vec<FeedEntry>, TrafficError> {
        let body = self.fetch(source)?;
        parse_feed(&body, selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_source_parse() {
        assert_eq!(
            "https://media.chp.ca.gov/sa_xml/sa.xml".parse::<FeedSource>(),
            Ok(FeedSource::Url("https://media.chp.ca.gov/sa_xml/sa.xml".into()))
        );
        assert_eq!(
            "HTTP://localhost:8000/sa.xml".parse::<FeedSource>(),
            Ok(FeedSource::Url("HTTP://localhost:8000/sa.xml".into()))
        );
        assert_eq!(
            "saved/sa.xml".parse::<FeedSource>(),
            Ok(FeedSource::File(PathBuf::from("saved/sa.xml")))
        );
        assert!("  ".parse::<FeedSource>().is_err());
    }

    #[test]
    fn test_default_source_round_trip() {
        let source = FeedSource::default();
        let parsed: FeedSource = source.to_string().parse().expect("failed to parse");
        assert_eq!(parsed, source);
    }

    #[test]
    fn test_fetch_from_file() {
        let path = std::env::temp_dir().join(format!("chptail-feed-{}.xml", std::process::id()));
        std::fs::write(
            &path,
            r#"<Dispatch ID="SACC"><Log ID="1"><LogTime>"Mar 15 2011  2:35PM"</LogTime></Log></Dispatch>"#,
        )
        .expect("write sample feed");

        let client = FeedClient::new().expect("client");
        let entries = client
            .fetch_entries(&FeedSource::File(path.clone()), &FeedSelector::default())
            .expect("fetch");
        let _ = std::fs::remove_file(&path);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id.as_deref(), Some("1"));
    }

    #[test]
    fn test_missing_file() {
        let client = FeedClient::new().expect("client");
        let err = client
            .fetch(&FeedSource::File(PathBuf::from("/nonexistent/chptail/sa.xml")))
            .expect_err("missing file");
        assert!(matches!(err, TrafficError::Io(_)));
    }
}
