//! The `listing` module holds the domain records that travel through the
//! pipeline: adoption listings, numeric sensor samples, and the breed catalog
//! that bounds which breeds a species may carry.

pub mod catalog;
pub mod model;

pub use catalog::BreedCatalog;
pub use model::{
    AnimalListing, FEED_TIMESTAMP_FORMAT, SensorSample, Species, UnknownSpecies,
    parse_posted_at, queue_name,
};
