use tempfile::tempdir;

use crate::broker::{QueueOptions, QueuedMessage};
use crate::persistence::QueueStore;

fn message(store: &QueueStore, body: &str) -> QueuedMessage {
    QueuedMessage {
        seq: store.next_seq().unwrap(),
        message_id: format!("id-{body}"),
        body: body.as_bytes().to_vec(),
        published_at: 1_725_000_000_000,
        redelivered: false,
    }
}

fn options() -> QueueOptions {
    QueueOptions::durable("application/octet-stream")
}

#[test]
fn test_store_and_load_in_publish_order() {
    let store = QueueStore::temporary().unwrap();
    store.save_queue("new-Dogs", &options()).unwrap();
    for body in ["first", "second", "third"] {
        let msg = message(&store, body);
        store.append("new-Dogs", &msg).unwrap();
    }

    let loaded = store.load_messages("new-Dogs").unwrap();
    let bodies: Vec<_> = loaded.iter().map(|m| m.body.as_slice()).collect();
    assert_eq!(
        bodies,
        vec![b"first".as_slice(), b"second".as_slice(), b"third".as_slice()]
    );
}

#[test]
fn test_remove_single_message() {
    let store = QueueStore::temporary().unwrap();
    let keep = message(&store, "keep");
    let gone = message(&store, "gone");
    store.append("q", &keep).unwrap();
    store.append("q", &gone).unwrap();

    store.remove("q", gone.seq).unwrap();

    let loaded = store.load_messages("q").unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0], keep);
}

#[test]
fn test_remove_queue_forgets_metadata_and_messages() {
    let store = QueueStore::temporary().unwrap();
    store.save_queue("q", &options()).unwrap();
    let msg = message(&store, "x");
    store.append("q", &msg).unwrap();

    store.remove_queue("q").unwrap();

    assert!(store.load_queues().unwrap().is_empty());
    assert!(store.load_messages("q").unwrap().is_empty());
}

#[test]
fn test_queues_survive_reopen() {
    let dir = tempdir().unwrap();
    {
        let store = QueueStore::open(dir.path()).unwrap();
        store.save_queue("new-Cats", &options()).unwrap();
        let msg = message(&store, "persisted");
        store.append("new-Cats", &msg).unwrap();
    }

    let store = QueueStore::open(dir.path()).unwrap();
    let queues = store.load_queues().unwrap();
    assert_eq!(queues.len(), 1);
    assert_eq!(queues[0].name, "new-Cats");
    assert_eq!(queues[0].options, options());
    assert_eq!(queues[0].messages.len(), 1);
    assert_eq!(queues[0].messages[0].body, b"persisted");
}

#[test]
fn test_sequence_numbers_increase() {
    let store = QueueStore::temporary().unwrap();
    let a = store.next_seq().unwrap();
    let b = store.next_seq().unwrap();
    assert!(b > a);
}

#[test]
fn test_empty_queue_returns_empty_deque() {
    let store = QueueStore::temporary().unwrap();
    assert!(store.load_messages("nonexistent").unwrap().is_empty());
}
