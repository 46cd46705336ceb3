//! Output formatters for traffic incidents.
//!
//! Supports human-readable (with colors), JSON, and NDJSON formats.

use std::io::{self, Write};
use std::sync::Arc;

use serde::Serialize;

use crate::incident::{Detail, Incident, MarkerKind};
use crate::store::Diff;

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

// Marker-kind colors
const RED: &str = "\x1b[91m";      // Fire, serious collisions
const YELLOW: &str = "\x1b[93m";   // Collisions
const CYAN: &str = "\x1b[96m";     // Maintenance / construction
const WHITE: &str = "\x1b[97m";    // Everything else
const GREEN: &str = "\x1b[92m";

const ALERT_RED: &str = "\x1b[41;97m"; // Red background

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

/// How an incident changed since the previous poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Change {
    Added,
    Updated,
    Removed,
}

impl Change {
    const fn marker(self) -> (&'static str, &'static str) {
        match self {
            Self::Added => ("+", GREEN),
            Self::Updated => ("~", YELLOW),
            Self::Removed => ("-", DIM),
        }
    }
}

/// Flattened incident for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct OutputIncident {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<Change>,
    pub id: String,
    pub time: String,
    pub kind: MarkerKind,
    pub log_type: String,
    pub location: String,
    pub area: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub sigalert: bool,
    pub details: Vec<Detail>,
}

impl From<&Incident> for OutputIncident {
    fn from(i: &Incident) -> Self {
        Self {
            change: None,
            id: i.id.clone(),
            time: i.log_time.format("%Y-%m-%dT%H:%M:%S").to_string(),
            kind: i.marker_kind(),
            log_type: i.log_type.clone(),
            location: i.location.clone(),
            area: i.area.clone(),
            latitude: i.geolocation.map(|g| g.lat),
            longitude: i.geolocation.map(|g| g.lon),
            sigalert: i.has_alert,
            details: i.details.clone(),
        }
    }
}

fn kind_color(kind: MarkerKind) -> &'static str {
    match kind {
        MarkerKind::Fire | MarkerKind::SeriousCollision => RED,
        MarkerKind::Collision => YELLOW,
        MarkerKind::Maintenance => CYAN,
        MarkerKind::Generic => WHITE,
    }
}

/// Write one incident as a colored line plus its indented details.
fn write_human_incident<W: Write>(
    writer: &mut W,
    incident: &Incident,
    change: Option<Change>,
) -> io::Result<()> {
    let kind = incident.marker_kind();
    let color = kind_color(kind);

    if let Some(change) = change {
        let (sign, sign_color) = change.marker();
        write!(writer, "{sign_color}{sign}{RESET} ")?;
    }

    write!(
        writer,
        "{DIM}{}{RESET} {color}{BOLD}{:<28}{RESET} {} {DIM}({}){RESET}",
        incident.log_time.format("%Y-%m-%d %H:%M"),
        incident.log_type,
        incident.location,
        incident.area,
    )?;
    if incident.has_alert {
        write!(writer, " {ALERT_RED} SIGALERT {RESET}")?;
    }
    writeln!(writer)?;

    // Removed incidents are shown as a single line
    if change == Some(Change::Removed) {
        return Ok(());
    }

    for detail in &incident.details {
        let highlight = if detail.is_alert() { RED } else { "" };
        writeln!(
            writer,
            "    {DIM}{}{RESET} {highlight}{}{RESET}",
            detail.time, detail.text
        )?;
    }
    Ok(())
}

fn write_json_rows<W: Write>(writer: &mut W, rows: &[OutputIncident]) -> io::Result<()> {
    let json = serde_json::to_string_pretty(rows)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

fn write_ndjson_rows<W: Write>(writer: &mut W, rows: &[OutputIncident]) -> io::Result<()> {
    for row in rows {
        let json = serde_json::to_string(row)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write incidents in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_incidents<W: Write>(
    writer: &mut W,
    incidents: &[Arc<Incident>],
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => {
            for incident in incidents {
                write_human_incident(writer, incident, None)?;
            }
            Ok(())
        }
        Format::Json | Format::Ndjson => {
            let rows: Vec<OutputIncident> =
                incidents.iter().map(|i| OutputIncident::from(i.as_ref())).collect();
            if format == Format::Json {
                write_json_rows(writer, &rows)
            } else {
                write_ndjson_rows(writer, &rows)
            }
        }
    }
}

/// Write the changed part of a diff (unchanged incidents are skipped).
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_diff<W: Write>(writer: &mut W, diff: &Diff, format: Format) -> io::Result<()> {
    let changes = diff
        .added
        .iter()
        .map(|i| (Change::Added, i))
        .chain(diff.updated.iter().map(|i| (Change::Updated, i)))
        .chain(diff.removed.iter().map(|i| (Change::Removed, i)));

    match format {
        Format::Human => {
            for (change, incident) in changes {
                write_human_incident(writer, incident, Some(change))?;
            }
            Ok(())
        }
        Format::Json | Format::Ndjson => {
            let rows: Vec<OutputIncident> = changes
                .map(|(change, incident)| OutputIncident {
                    change: Some(change),
                    ..OutputIncident::from(incident.as_ref())
                })
                .collect();
            if format == Format::Json {
                write_json_rows(writer, &rows)
            } else {
                write_ndjson_rows(writer, &rows)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FeedEntry, RawDetail};
    use crate::store::IncidentStore;

    fn entry(id: &str, log_type: &str) -> FeedEntry {
        FeedEntry {
            id: Some(id.into()),
            area: "\"Sacramento\"".into(),
            location: "\"I80 EB JEO Madison Ave\"".into(),
            log_time: "\"Mar 15 2011  2:35PM\"".into(),
            log_type: format!("\"{log_type}\""),
            latlon: "\"38560000:121400000\"".into(),
            details: vec![RawDetail {
                time: "\"Mar 15 2011  2:36PM\"".into(),
                text: "\"[1] SIGALERT* ISSUED\"".into(),
            }],
        }
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("human".parse::<Format>().unwrap(), Format::Human);
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("NDJSON".parse::<Format>().unwrap(), Format::Ndjson);
        assert!("invalid".parse::<Format>().is_err());
    }

    #[test]
    fn test_human_output() {
        let mut store = IncidentStore::new();
        let diff = store.update(&[entry("A", "1182-Trfc Collision-No Inj")]);

        let mut out = Vec::new();
        write_incidents(&mut out, &diff.added, Format::Human).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("2011-03-15 14:35"));
        assert!(text.contains("Collision - No Injury"));
        assert!(text.contains("I80 east bound just east of Madison Ave"));
        assert!(text.contains("SIGALERT"));
        assert!(text.contains("sigalert* issued"));
    }

    #[test]
    fn test_ndjson_diff() {
        let mut store = IncidentStore::new();
        store.update(&[entry("A", "1125-Traffic Hazard"), entry("B", "1125-Traffic Hazard")]);
        let diff = store.update(&[entry("A", "1183-Trfc Collision-Inj"), entry("C", "FIRE-Report of")]);

        let mut out = Vec::new();
        write_diff(&mut out, &diff, Format::Ndjson).unwrap();
        let text = String::from_utf8(out).unwrap();
        let rows: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["change"], "added");
        assert_eq!(rows[0]["id"], "C");
        assert_eq!(rows[0]["kind"], "fire");
        assert_eq!(rows[1]["change"], "updated");
        assert_eq!(rows[1]["log_type"], "Collision - Injury");
        assert_eq!(rows[2]["change"], "removed");
        assert_eq!(rows[2]["id"], "B");
        assert_eq!(rows[2]["longitude"], -121.4);
        assert_eq!(rows[2]["sigalert"], true);
    }

    #[test]
    fn test_json_incidents() {
        let mut store = IncidentStore::new();
        let diff = store.update(&[entry("A", "1125-Traffic Hazard")]);

        let mut out = Vec::new();
        write_incidents(&mut out, &diff.added, Format::Json).unwrap();
        let rows: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(rows.as_array().map(Vec::len), Some(1));
        assert_eq!(rows[0]["time"], "2011-03-15T14:35:00");
        assert!(rows[0].get("change").is_none());
        assert_eq!(rows[0]["details"][0]["time"], "2:36PM");
    }
}
