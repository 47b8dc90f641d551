use serde::{Deserialize, Serialize};

use crate::listing::{AnimalListing, SensorSample, Species};
use crate::utils::error::SerializationError;

pub const ENVELOPE_VERSION: u32 = 1;

/// Byte length of a numeric sample: `f64` timestamp followed by `f32` reading.
pub const SAMPLE_LEN: usize = 12;

const LISTING_KIND: &str = "listing";
const LISTING_CONTENT_TYPE: &str = "application/vnd.shelterfeed.listing+json; version=1";
const SAMPLE_CONTENT_TYPE: &str = "application/vnd.shelterfeed.sample; version=1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeShape {
    Listing,
    Sample,
}

impl EnvelopeShape {
    pub fn content_type(&self) -> &'static str {
        match self {
            EnvelopeShape::Listing => LISTING_CONTENT_TYPE,
            EnvelopeShape::Sample => SAMPLE_CONTENT_TYPE,
        }
    }

    pub fn from_content_type(content_type: &str) -> Result<Self, SerializationError> {
        match content_type {
            LISTING_CONTENT_TYPE => Ok(EnvelopeShape::Listing),
            SAMPLE_CONTENT_TYPE => Ok(EnvelopeShape::Sample),
            other => Err(SerializationError::UnknownContentType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Listing(AnimalListing),
    Sample(SensorSample),
}

impl Envelope {
    pub fn shape(&self) -> EnvelopeShape {
        match self {
            Envelope::Listing(_) => EnvelopeShape::Listing,
            Envelope::Sample(_) => EnvelopeShape::Sample,
        }
    }
}

/// Only the header fields, read first so that a version or kind mismatch is
/// reported as such instead of as a missing-field error.
#[derive(Deserialize)]
struct Header {
    version: u32,
    kind: String,
}

#[derive(Serialize, Deserialize)]
struct ListingEnvelope {
    version: u32,
    kind: String,
    listing: ListingRecord,
}

#[derive(Serialize, Deserialize)]
struct ListingRecord {
    name: String,
    species: Species,
    breed: String,
    age: u32,
    color: String,
    shelter_name: String,
    shelter_city: String,
    shelter_state: String,
    #[serde(with = "posted_at")]
    posted_at: chrono::NaiveDateTime,
}

impl From<&AnimalListing> for ListingRecord {
    fn from(listing: &AnimalListing) -> Self {
        Self {
            name: listing.name.clone(),
            species: listing.species,
            breed: listing.breed.clone(),
            age: listing.age,
            color: listing.color.clone(),
            shelter_name: listing.shelter_name.clone(),
            shelter_city: listing.shelter_city.clone(),
            shelter_state: listing.shelter_state.clone(),
            posted_at: listing.posted_at,
        }
    }
}

impl From<ListingRecord> for AnimalListing {
    fn from(record: ListingRecord) -> Self {
        Self {
            name: record.name,
            species: record.species,
            breed: record.breed,
            age: record.age,
            color: record.color,
            shelter_name: record.shelter_name,
            shelter_city: record.shelter_city,
            shelter_state: record.shelter_state,
            posted_at: record.posted_at,
        }
    }
}

mod posted_at {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer, de};

    use crate::listing::parse_posted_at;

    const WRITE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Epoch(i64),
    }

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(WRITE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => parse_posted_at(&text)
                .map_err(|e| de::Error::custom(format!("invalid posted_at '{text}': {e}"))),
            Raw::Epoch(secs) => DateTime::from_timestamp(secs, 0)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| de::Error::custom(format!("posted_at epoch {secs} out of range"))),
        }
    }
}

pub fn encode_listing(listing: &AnimalListing) -> Result<Vec<u8>, SerializationError> {
    let envelope = ListingEnvelope {
        version: ENVELOPE_VERSION,
        kind: LISTING_KIND.to_string(),
        listing: ListingRecord::from(listing),
    };
    Ok(serde_json::to_vec(&envelope)?)
}

pub fn decode_listing(bytes: &[u8]) -> Result<AnimalListing, SerializationError> {
    let header: Header = serde_json::from_slice(bytes)?;
    if header.version != ENVELOPE_VERSION {
        return Err(SerializationError::UnsupportedVersion(header.version));
    }
    if header.kind != LISTING_KIND {
        return Err(SerializationError::UnexpectedKind(header.kind));
    }
    let envelope: ListingEnvelope = serde_json::from_slice(bytes)?;
    Ok(envelope.listing.into())
}

pub fn encode_sample(sample: &SensorSample) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SAMPLE_LEN);
    buf.extend_from_slice(&sample.timestamp.to_be_bytes());
    buf.extend_from_slice(&sample.reading.to_be_bytes());
    buf
}

pub fn decode_sample(bytes: &[u8]) -> Result<SensorSample, SerializationError> {
    if bytes.len() != SAMPLE_LEN {
        return Err(SerializationError::SampleLength {
            expected: SAMPLE_LEN,
            actual: bytes.len(),
        });
    }
    let mut timestamp = [0u8; 8];
    timestamp.copy_from_slice(&bytes[..8]);
    let mut reading = [0u8; 4];
    reading.copy_from_slice(&bytes[8..]);
    Ok(SensorSample {
        timestamp: f64::from_be_bytes(timestamp),
        reading: f32::from_be_bytes(reading),
    })
}

pub fn encode(envelope: &Envelope) -> Result<Vec<u8>, SerializationError> {
    match envelope {
        Envelope::Listing(listing) => encode_listing(listing),
        Envelope::Sample(sample) => Ok(encode_sample(sample)),
    }
}

/// Decode `bytes` with the decoder for `shape`.
pub fn decode(shape: EnvelopeShape, bytes: &[u8]) -> Result<Envelope, SerializationError> {
    match shape {
        EnvelopeShape::Listing => decode_listing(bytes).map(Envelope::Listing),
        EnvelopeShape::Sample => decode_sample(bytes).map(Envelope::Sample),
    }
}
