//! Error types for chptail.
//!
//! Uses `thiserror` for library-style error definitions.

use thiserror::Error;

/// Errors that can occur in chptail operations.
#[derive(Error, Debug)]
pub enum TrafficError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading a local feed file failed
    #[error("failed to read feed file: {0}")]
    Io(#[from] std::io::Error),

    /// The feed document is not well-formed XML
    #[error("failed to parse feed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Feed server returned an error status
    #[error("feed server error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Feed entry has no identity attribute
    #[error("feed entry has no ID")]
    MissingIdentity,

    /// Feed entry carries a log time we cannot read
    #[error("unparsable log time: {0:?}")]
    InvalidLogTime(String),
}

impl TrafficError {
    /// Whether this error describes a single bad feed entry rather than a
    /// failure of the whole document or transport.
    #[must_use]
    pub fn is_malformed_entry(&self) -> bool {
        matches!(self, Self::MissingIdentity | Self::InvalidLogTime(_))
    }
}
