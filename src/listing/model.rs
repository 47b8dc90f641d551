//! Listing and sample records
//!
//! `AnimalListing` is the structured record published by the producer and
//! logged by the consumer. Records are plain values: once built they are only
//! ever cloned, encoded or compared, never modified in place.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Timestamp layout used by the upstream adoption feed, e.g. `06/10/24 10:00:00`.
pub const FEED_TIMESTAMP_FORMAT: &str = "%m/%d/%y %H:%M:%S";

const ISO_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    Dog,
    Cat,
}

impl Species {
    pub const ALL: [Species; 2] = [Species::Dog, Species::Cat];

    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Dog => "Dog",
            Species::Cat => "Cat",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown species '{0}'")]
pub struct UnknownSpecies(pub String);

impl FromStr for Species {
    type Err = UnknownSpecies;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "dog" => Ok(Species::Dog),
            "cat" => Ok(Species::Cat),
            _ => Err(UnknownSpecies(trimmed.to_string())),
        }
    }
}

/// Name of the queue that carries listings of `species`, e.g. `new-Dogs`.
pub fn queue_name(species: Species) -> String {
    format!("new-{species}s")
}

/// Parse a posted-at value in ISO-8601 or the feed's `%m/%d/%y %H:%M:%S` layout.
pub fn parse_posted_at(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let text = text.trim();
    ISO_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map_or_else(
            || NaiveDateTime::parse_from_str(text, FEED_TIMESTAMP_FORMAT),
            Ok,
        )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimalListing {
    pub name: String,
    pub species: Species,
    pub breed: String,
    pub age: u32,
    pub color: String,
    pub shelter_name: String,
    pub shelter_city: String,
    pub shelter_state: String,
    pub posted_at: NaiveDateTime,
}

impl AnimalListing {
    pub fn queue_name(&self) -> String {
        queue_name(self.species)
    }
}

impl fmt::Display for AnimalListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}, {}, {}, {}, {}, {}",
            self.name,
            self.species,
            self.breed,
            self.age,
            self.color,
            self.shelter_name,
            self.shelter_city,
            self.shelter_state,
            self.posted_at.format(FEED_TIMESTAMP_FORMAT)
        )
    }
}

/// One reading from the numeric simulation path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    /// Seconds since the UNIX epoch.
    pub timestamp: f64,
    pub reading: f32,
}
