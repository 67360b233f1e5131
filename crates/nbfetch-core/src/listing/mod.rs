//! Link collection from the date-partitioned HTML listing.
//!
//! The listing is `{base}{YYYYMM}/{YYYYMMDD}/`, one directory per build under
//! each date, artifacts under `{build}{platform_path}`. Every page renders its
//! entries in a `<table id="list">` with name, size and date columns.

mod collector;
mod dates;
mod fetch;
mod parse;

pub use collector::{Collector, HttpListing, ListingSource};
pub use dates::{date_range, date_url};
pub use fetch::fetch_listing;
pub use parse::{matches_python_version, parse_build_dirs, parse_file_rows, FileRow};
