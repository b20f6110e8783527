//! shelf-scout: a single-session snapshot of a filtered retail listing
//!
//! Drives a browser through a retail site's search-and-filter flow,
//! extracts structured product records from the rendered listing, and
//! optionally enriches each record from its detail page.

pub mod browser;
pub mod config;
pub mod context;
pub mod enrich;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod sequencer;
pub mod site;
