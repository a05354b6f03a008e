//! Program-data extraction pipeline: fetch page text, apply pattern rules,
//! upsert Program records.

pub mod extract;
pub mod fetch;
pub mod pipeline;

pub use extract::{ProgramFields, extract};
pub use fetch::{ContentFetcher, HttpContentFetcher};
pub use pipeline::{FIXED_PROGRAMS, refresh_programs};
