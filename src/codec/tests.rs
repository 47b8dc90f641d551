use chrono::NaiveDate;
use serde_json::json;

use super::{
    Envelope, EnvelopeShape, SAMPLE_LEN, decode, decode_listing, decode_sample, encode,
    encode_listing, encode_sample,
};
use crate::listing::{AnimalListing, SensorSample, Species};
use crate::utils::error::SerializationError;

fn rex() -> AnimalListing {
    AnimalListing {
        name: "Rex".to_string(),
        species: Species::Dog,
        breed: "Poodle".to_string(),
        age: 3,
        color: "Black".to_string(),
        shelter_name: "Happy Paws Rescue".to_string(),
        shelter_city: "Reno".to_string(),
        shelter_state: "NV".to_string(),
        posted_at: NaiveDate::from_ymd_opt(2024, 6, 10)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap(),
    }
}

fn rex_json() -> serde_json::Value {
    json!({
        "version": 1,
        "kind": "listing",
        "listing": {
            "name": "Rex",
            "species": "Dog",
            "breed": "Poodle",
            "age": 3,
            "color": "Black",
            "shelter_name": "Happy Paws Rescue",
            "shelter_city": "Reno",
            "shelter_state": "NV",
            "posted_at": "06/10/24 10:00:00"
        }
    })
}

#[test]
fn test_listing_round_trips() {
    let mut whiskers = rex();
    whiskers.name = "Whiskers, Jr.".to_string();
    whiskers.species = Species::Cat;
    whiskers.breed = "Maine Coon".to_string();
    whiskers.age = 0;
    whiskers.posted_at = NaiveDate::from_ymd_opt(2023, 12, 31)
        .unwrap()
        .and_hms_milli_opt(23, 59, 59, 250)
        .unwrap();

    for listing in [rex(), whiskers] {
        let bytes = encode_listing(&listing).unwrap();
        assert_eq!(decode_listing(&bytes).unwrap(), listing);
    }
}

#[test]
fn test_envelope_dispatch_round_trips_both_shapes() {
    let sample = SensorSample {
        timestamp: 1_717_999_200.0,
        reading: 225.5,
    };
    for envelope in [Envelope::Listing(rex()), Envelope::Sample(sample)] {
        let bytes = encode(&envelope).unwrap();
        assert_eq!(decode(envelope.shape(), &bytes).unwrap(), envelope);
    }
}

#[test]
fn test_decodes_feed_formatted_and_epoch_timestamps() {
    let bytes = serde_json::to_vec(&rex_json()).unwrap();
    assert_eq!(decode_listing(&bytes).unwrap(), rex());

    let mut value = rex_json();
    value["listing"]["posted_at"] = json!(1_718_013_600);
    let bytes = serde_json::to_vec(&value).unwrap();
    assert_eq!(decode_listing(&bytes).unwrap(), rex());
}

#[test]
fn test_missing_required_field_is_rejected() {
    let mut value = rex_json();
    value["listing"].as_object_mut().unwrap().remove("age");
    let bytes = serde_json::to_vec(&value).unwrap();
    assert!(matches!(
        decode_listing(&bytes),
        Err(SerializationError::Malformed(_))
    ));
}

#[test]
fn test_negative_age_is_rejected() {
    let mut value = rex_json();
    value["listing"]["age"] = json!(-1);
    let bytes = serde_json::to_vec(&value).unwrap();
    assert!(decode_listing(&bytes).is_err());
}

#[test]
fn test_unknown_version_and_kind_are_typed_errors() {
    let mut value = rex_json();
    value["version"] = json!(2);
    let bytes = serde_json::to_vec(&value).unwrap();
    assert!(matches!(
        decode_listing(&bytes),
        Err(SerializationError::UnsupportedVersion(2))
    ));

    let mut value = rex_json();
    value["kind"] = json!("sample");
    let bytes = serde_json::to_vec(&value).unwrap();
    assert!(matches!(
        decode_listing(&bytes),
        Err(SerializationError::UnexpectedKind(kind)) if kind == "sample"
    ));
}

#[test]
fn test_garbage_bytes_are_a_serialization_error() {
    assert!(decode_listing(b"\x80\x03}q\x00").is_err());
    assert!(decode_listing(b"").is_err());
}

#[test]
fn test_sample_layout_is_big_endian_double_then_float() {
    let sample = SensorSample {
        timestamp: 1.0,
        reading: 2.0,
    };
    let bytes = encode_sample(&sample);
    assert_eq!(bytes.len(), SAMPLE_LEN);
    assert_eq!(&bytes[..8], &1.0f64.to_be_bytes());
    assert_eq!(&bytes[8..], &2.0f32.to_be_bytes());
    assert_eq!(decode_sample(&bytes).unwrap(), sample);
}

#[test]
fn test_sample_of_wrong_length_is_rejected() {
    let err = decode_sample(&[0u8; 11]).unwrap_err();
    assert!(matches!(
        err,
        SerializationError::SampleLength {
            expected: 12,
            actual: 11
        }
    ));
    let listing_bytes = encode_listing(&rex()).unwrap();
    assert!(decode(EnvelopeShape::Sample, &listing_bytes).is_err());
}

#[test]
fn test_content_types_map_back_to_shapes() {
    for shape in [EnvelopeShape::Listing, EnvelopeShape::Sample] {
        assert_eq!(
            EnvelopeShape::from_content_type(shape.content_type()).unwrap(),
            shape
        );
    }
    assert!(EnvelopeShape::from_content_type("text/plain").is_err());
}
