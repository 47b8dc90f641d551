//! The `codec` module turns domain records into wire-safe bytes and back.
//!
//! Two envelope shapes exist. The structured shape is self-describing JSON
//! carrying a schema version; the numeric shape is a fixed 12-byte layout
//! with no self-description, so a queue's declared content type is what tells
//! a consumer which decoder applies.

pub mod envelope;

pub use envelope::{
    ENVELOPE_VERSION, Envelope, EnvelopeShape, SAMPLE_LEN, decode, decode_listing, decode_sample,
    encode, encode_listing, encode_sample,
};

#[cfg(test)]
mod tests;
