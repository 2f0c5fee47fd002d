// Collector module - per-scrape snapshot of Opsgenie state
// Drives the query plan and streams the results into an observation sink

pub mod sink;
pub mod snapshot;

pub use sink::{FamilyBuffer, Observation, ObservationSink};
pub use snapshot::{ScrapeReport, SnapshotCollector};
