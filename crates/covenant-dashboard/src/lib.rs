//! # covenant-dashboard
//!
//! Read-only dashboard snapshot composed from five independent reads.

pub mod aggregator;

pub use aggregator::DashboardAggregator;
