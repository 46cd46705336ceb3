//! Typed incident records.
//!
//! An [`Incident`] is built from one raw [`FeedEntry`]: text fields go through
//! the normalizer, the log time and coordinates are decoded, and the detail
//! log is cleaned up for display.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::errors::TrafficError;
use crate::feed::FeedEntry;
use crate::normalize::{dequote, normalize};

/// Coordinates in the feed are integers scaled by this factor.
const COORDINATE_SCALE: f64 = 1_000_000.0;

/// Raw `LATLON` value meaning "no location".
const NO_LOCATION: &str = "0:0";

/// Log time layouts seen in the feed, after whitespace is collapsed.
const LOG_TIME_FORMATS: &[&str] = &[
    "%b %d %Y %I:%M %p",
    "%b %d %Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

#[allow(clippy::expect_used)]
static LOG_TYPE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+\w*|[A-Z]+)-").expect("valid regex"));

#[allow(clippy::expect_used)]
static MERIDIEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\S)([AP]M)$").expect("valid regex"));

#[allow(clippy::expect_used)]
static DETAIL_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+.*?\d{4} ").expect("valid regex"));

#[allow(clippy::expect_used)]
static MINOR_COLLISION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Collision.*(?:No|Unknown) Injur").expect("valid regex"));

#[allow(clippy::expect_used)]
static ALERT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)sigalert\s*\*").expect("valid regex"));

/// A point in signed decimal degrees (west and south negative).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// One line of an incident's detail log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detail {
    /// Time of day the line was logged (date prefix removed)
    pub time: String,
    /// Normalized, lower-cased text
    pub text: String,
}

impl Detail {
    /// Whether this line carries the SigAlert marker.
    #[must_use]
    pub fn is_alert(&self) -> bool {
        is_alert_text(&self.text)
    }
}

/// Map icon category for an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerKind {
    Fire,
    Maintenance,
    Collision,
    #[serde(rename = "collision-serious")]
    SeriousCollision,
    Generic,
}

impl MarkerKind {
    /// Classify a normalized log type. The first matching category wins.
    #[must_use]
    pub fn from_log_type(log_type: &str) -> Self {
        if log_type.contains("Fire") {
            Self::Fire
        } else if log_type.contains("Maintenance") || log_type.contains("Construction") {
            Self::Maintenance
        } else if MINOR_COLLISION_RE.is_match(log_type) {
            Self::Collision
        } else if log_type.contains("Ambulance Enroute") || log_type.contains("Fatality") {
            Self::SeriousCollision
        } else {
            Self::Generic
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fire => "fire",
            Self::Maintenance => "maintenance",
            Self::Collision => "collision",
            Self::SeriousCollision => "collision-serious",
            Self::Generic => "generic",
        }
    }
}

/// A parsed, display-ready incident.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Incident {
    /// Feed identity, verbatim
    pub id: String,
    pub area: String,
    pub location: String,
    /// Local wall-clock time; the feed carries no zone
    pub log_time: NaiveDateTime,
    /// Category text without its dispatch code
    pub log_type: String,
    pub geolocation: Option<GeoPoint>,
    pub details: Vec<Detail>,
    pub has_alert: bool,
}

impl Incident {
    /// Build an incident from a raw feed entry.
    ///
    /// # Errors
    ///
    /// Returns [`TrafficError::MissingIdentity`] when the entry has no ID and
    /// [`TrafficError::InvalidLogTime`] when its log time cannot be read.
    pub fn parse(entry: &FeedEntry) -> Result<Self, TrafficError> {
        let id = entry
            .id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(TrafficError::MissingIdentity)?
            .to_string();

        let log_time = parse_log_time(&entry.log_time)?;
        let log_type = LOG_TYPE_CODE_RE
            .replace(&normalize(&entry.log_type), "")
            .into_owned();

        let mut has_alert = false;
        let mut details = Vec::with_capacity(entry.details.len());
        for raw in &entry.details {
            let time = DETAIL_DATE_RE.replace(&dequote(&raw.time), "").trim().to_string();
            let text = normalize(&raw.text).to_lowercase();

            has_alert |= is_alert_text(&text);

            if !time.is_empty() && !text.is_empty() {
                details.push(Detail { time, text });
            }
        }

        let geolocation = parse_latlon(&entry.latlon);
        if geolocation.is_none() {
            debug!(id = %id, "incident has no location");
        }

        Ok(Self {
            id,
            area: normalize(&entry.area),
            location: normalize(&entry.location),
            log_time,
            log_type,
            geolocation,
            details,
            has_alert,
        })
    }

    /// Whether `self` can stand in for `previous` without re-rendering.
    ///
    /// Only the ID, the log type and the number of detail lines are
    /// compared; edits to existing detail lines do not count.
    #[must_use]
    pub fn is_unchanged_from(&self, previous: &Self) -> bool {
        self.id == previous.id
            && self.log_type == previous.log_type
            && self.details.len() == previous.details.len()
    }

    /// Map icon category for this incident.
    #[must_use]
    pub fn marker_kind(&self) -> MarkerKind {
        MarkerKind::from_log_type(&self.log_type)
    }
}

impl TryFrom<&FeedEntry> for Incident {
    type Error = TrafficError;

    fn try_from(entry: &FeedEntry) -> Result<Self, Self::Error> {
        Self::parse(entry)
    }
}

fn is_alert_text(text: &str) -> bool {
    ALERT_RE.is_match(text)
}

/// Parse a feed log time such as `"Mar 15 2011  2:35PM"`.
///
/// # Errors
///
/// Returns [`TrafficError::InvalidLogTime`] if no known layout matches.
pub fn parse_log_time(raw: &str) -> Result<NaiveDateTime, TrafficError> {
    let unquoted = dequote(raw);
    let spaced = MERIDIEM_RE.replace(unquoted.trim(), "${1} ${2}");
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");

    LOG_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&collapsed, format).ok())
        .ok_or_else(|| TrafficError::InvalidLogTime(raw.to_string()))
}

/// Decode a feed `LATLON` value.
///
/// Returns `None` for an empty value, the `"0:0"` sentinel, or anything that
/// is not two numbers.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn parse_latlon(raw: &str) -> Option<GeoPoint> {
    let unquoted = dequote(raw);
    let value = unquoted.trim();
    if value.is_empty() || value == NO_LOCATION {
        return None;
    }

    // Scaled integers only; `f64` parsing would also accept "NaN" and "inf".
    let parsed = value.split_once(':').and_then(|(lat, lon)| {
        let lat = lat.trim().parse::<i64>().ok()?;
        let lon = lon.trim().parse::<i64>().ok()?;
        Some(GeoPoint {
            lat: lat as f64 / COORDINATE_SCALE,
            lon: -(lon as f64 / COORDINATE_SCALE),
        })
    });
    if parsed.is_none() {
        debug!("ignoring unreadable LATLON {:?}", raw);
    }
    parsed
}
