mod aggregation;
pub mod views;

pub use aggregation::{compute_agency_summaries, compute_stats, store_directory};
pub use views::{AgencySummary, Stats, StoreEntry};
