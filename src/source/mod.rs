//! Record sources feeding the producer: the adoption listing feed and the
//! sensor sample feed of the numeric path.

pub mod csv;
pub mod listings;
pub mod samples;

pub use listings::{LISTING_COLUMNS, ListingSource, parse_listing};
pub use samples::{SAMPLE_QUEUES, SampleRow, SampleSource, parse_sample_row};
