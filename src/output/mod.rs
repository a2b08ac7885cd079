//! Output module for crawl reports
//!
//! Visited URLs go to stdout as the crawl runs; everything in this module
//! describes a finished crawl.

pub mod stats;

pub use stats::{print_statistics, write_statistics};
