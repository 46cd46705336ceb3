//! chptail - Live CHP traffic incidents.
//!
//! Polls the CHP dispatch-log feed, turns each log into a readable
//! [`Incident`](incident::Incident), and reconciles every poll against the
//! incidents already on screen so a front end only redraws what changed.
//!
//! ```no_run
//! use chptail::client::{FeedClient, FeedSource};
//! use chptail::feed::FeedSelector;
//! use chptail::store::IncidentStore;
//!
//! # fn main() -> Result<(), chptail::errors::TrafficError> {
//! let client = FeedClient::new()?;
//! let mut store = IncidentStore::new();
//!
//! let entries = client.fetch_entries(&FeedSource::default(), &FeedSelector::default())?;
//! let diff = store.update(&entries);
//! println!("{}", diff.summary());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod client;
pub mod errors;
pub mod feed;
pub mod incident;
pub mod normalize;
pub mod output;
pub mod store;
