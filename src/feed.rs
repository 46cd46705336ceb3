//! CHP dispatch-log XML feed.
//!
//! The feed is one document grouping every open incident by communications
//! center:
//!
//! ```xml
//! <State ID="CHP">
//!   <Center ID="SAHB">
//!     <Dispatch ID="SACC">
//!       <Log ID="0193D0315">
//!         <LogTime>"Mar 15 2011  2:35PM"</LogTime>
//!         <LogType>"1125-Traffic Hazard"</LogType>
//!         <Location>"I80 EB JEO MADISON AVE"</Location>
//!         <Area>"Sacramento"</Area>
//!         <LATLON>"38661234:121312345"</LATLON>
//!         <LogDetails>
//!           <details>
//!             <DetailTime>"Mar 15 2011  2:36PM"</DetailTime>
//!             <IncidentDetail>"[2] RP ADVSD DEBRIS IN LANES"</IncidentDetail>
//!           </details>
//!         </LogDetails>
//!       </Log>
//!     </Dispatch>
//!   </Center>
//! </State>
//! ```
//!
//! Values keep their raw form here (quotes included); normalization happens
//! when an entry becomes an [`Incident`](crate::incident::Incident).

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::errors::TrafficError;

/// Dispatch center shown when none is configured (Sacramento).
pub const DEFAULT_DISPATCH: &str = "SACC";

/// Substring marking Freeway Service Patrol logs in a log ID.
const SERVICE_PATROL_MARKER: &str = "FSP";

/// One `<Log>` element, as raw strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    /// `ID` attribute (`None` when absent)
    pub id: Option<String>,
    pub area: String,
    pub location: String,
    pub log_time: String,
    pub log_type: String,
    /// `"<lat>:<lon>"`, both scaled by 1e6, lon as a west magnitude
    pub latlon: String,
    pub details: Vec<RawDetail>,
}

/// One `<details>` element of a log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDetail {
    pub time: String,
    pub text: String,
}

/// Which logs of the document to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSelector {
    /// Dispatch center ID; `None` keeps logs from every center
    pub dispatch: Option<String>,
    /// Drop Freeway Service Patrol logs
    pub exclude_service_patrol: bool,
}

impl Default for FeedSelector {
    fn default() -> Self {
        Self {
            dispatch: Some(DEFAULT_DISPATCH.to_string()),
            exclude_service_patrol: true,
        }
    }
}

impl FeedSelector {
    /// Keep every log in the document.
    #[must_use]
    pub fn all() -> Self {
        Self {
            dispatch: None,
            exclude_service_patrol: false,
        }
    }

    fn wants_dispatch(&self, dispatch: Option<&str>) -> bool {
        match &self.dispatch {
            None => true,
            Some(wanted) => dispatch == Some(wanted.as_str()),
        }
    }

    fn wants_log(&self, id: Option<&str>) -> bool {
        !(self.exclude_service_patrol && id.is_some_and(|id| id.contains(SERVICE_PATROL_MARKER)))
    }
}

/// Extract the selected logs from a feed document, in document order.
///
/// # Errors
///
/// Returns [`TrafficError::Xml`] if the document is not well-formed.
pub fn parse_feed(xml: &str, selector: &FeedSelector) -> Result<Vec<FeedEntry>, TrafficError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut dispatch: Option<String> = None;
    let mut current: Option<FeedEntry> = None;
    let mut detail: Option<RawDetail> = None;
    let mut skipped_logs = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match name.as_str() {
                    "Dispatch" => dispatch = id_attribute(&e)?,
                    "Log" if current.is_none() => {
                        if selector.wants_dispatch(dispatch.as_deref()) {
                            current = Some(FeedEntry {
                                id: id_attribute(&e)?,
                                ..FeedEntry::default()
                            });
                        }
                    }
                    "details" if current.is_some() => detail = Some(RawDetail::default()),
                    _ => {}
                }
                path.push(name);
            }
            Event::End(e) => {
                match e.name().as_ref() {
                    b"Dispatch" => dispatch = None,
                    b"details" => {
                        if let (Some(entry), Some(finished)) = (current.as_mut(), detail.take()) {
                            entry.details.push(finished);
                        }
                    }
                    b"Log" => {
                        if let Some(entry) = current.take() {
                            if selector.wants_log(entry.id.as_deref()) {
                                entries.push(entry);
                            } else {
                                skipped_logs += 1;
                            }
                        }
                    }
                    _ => {}
                }
                path.pop();
            }
            // A self-closing log has no fields but still goes to the store,
            // which rejects it with a warning like any other unreadable entry.
            Event::Empty(e) if e.name().as_ref() == b"Log" && current.is_none() => {
                if selector.wants_dispatch(dispatch.as_deref()) {
                    let entry = FeedEntry {
                        id: id_attribute(&e)?,
                        ..FeedEntry::default()
                    };
                    if selector.wants_log(entry.id.as_deref()) {
                        entries.push(entry);
                    } else {
                        skipped_logs += 1;
                    }
                }
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                append_text(&mut current, &mut detail, path.last().map(String::as_str), &text);
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c);
                append_text(&mut current, &mut detail, path.last().map(String::as_str), &text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    debug!(
        "parsed {} logs from feed ({} service patrol logs skipped)",
        entries.len(),
        skipped_logs
    );
    Ok(entries)
}

fn id_attribute(e: &BytesStart<'_>) -> Result<Option<String>, TrafficError> {
    let attr = e
        .try_get_attribute("ID")
        .map_err(quick_xml::Error::from)?;
    match attr {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn append_text(
    current: &mut Option<FeedEntry>,
    detail: &mut Option<RawDetail>,
    tag: Option<&str>,
    text: &str,
) {
    let (Some(entry), Some(tag)) = (current.as_mut(), tag) else {
        return;
    };

    let field = match (tag, detail.as_mut()) {
        ("DetailTime", Some(d)) => &mut d.time,
        ("IncidentDetail", Some(d)) => &mut d.text,
        ("Area", _) => &mut entry.area,
        ("Location", _) => &mut entry.location,
        ("LogTime", _) => &mut entry.log_time,
        ("LogType", _) => &mut entry.log_type,
        ("LATLON", _) => &mut entry.latlon,
        _ => return,
    };
    field.push_str(text);
}
