use super::error::{ChannelError, ConsumerError, ValidationError};
use super::logging;
use crate::listing::Species;

#[test]
fn test_logging_init_accepts_levels() {
    // Should not panic
    assert!(logging::init("info", None).is_none());
    assert!(logging::init("debug", None).is_none());
    assert!(logging::init("warn", None).is_none());
}

#[test]
fn test_level_directive_falls_back_to_info() {
    assert_eq!(logging::level_directive("WARNING"), "warn");
    assert_eq!(logging::level_directive(" trace "), "trace");
    assert_eq!(logging::level_directive("verbose"), "info");
}

#[test]
fn test_connection_error_names_host_and_cause() {
    let err = ChannelError::Connection {
        host: "localhost:5680".to_string(),
        reason: "Connection refused (os error 111)".to_string(),
    };
    let text = err.to_string();
    assert!(text.contains("localhost:5680"));
    assert!(text.contains("Connection refused"));
}

#[test]
fn test_validation_error_reports_line_and_breed() {
    let err = ValidationError::UnknownBreed {
        line: 7,
        species: Species::Cat,
        breed: "Poodle".to_string(),
    };
    assert_eq!(err.to_string(), "line 7: 'Poodle' is not a known Cat breed");
}

#[test]
fn test_only_user_cancellation_counts_as_cancellation() {
    assert!(ConsumerError::UserCancellation.is_cancellation());
    assert!(!ConsumerError::Channel(ChannelError::Closed).is_cancellation());
}
