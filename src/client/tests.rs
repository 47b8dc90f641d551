use super::session::Client;
use tokio::sync::mpsc;

#[test]
fn test_client_new() {
    let (tx, _) = mpsc::unbounded_channel();
    let client = Client::new(tx);
    assert!(client.id.starts_with("client-"));
    assert_eq!(client.prefetch, 0);
    assert_eq!(client.in_flight, 0);
}

#[test]
fn test_unlimited_window_always_has_capacity() {
    let (tx, _) = mpsc::unbounded_channel();
    let mut client = Client::new(tx);
    client.in_flight = 10_000;
    assert!(client.has_capacity());
}

#[test]
fn test_prefetch_window_closes_at_limit() {
    let (tx, _) = mpsc::unbounded_channel();
    let mut client = Client::new(tx);
    client.prefetch = 1;
    assert!(client.has_capacity());
    client.in_flight = 1;
    assert!(!client.has_capacity());
}
