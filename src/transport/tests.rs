use crate::broker::{Broker, QueueOptions, lock};
use crate::transport::channel::BrokerChannel;
use crate::transport::handler::handle_client_message;
use crate::transport::local_channel::LocalChannel;
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::utils::error::ChannelError;
use serde_json::json;
use std::sync::{Arc, Mutex};

fn shared_broker() -> Arc<Mutex<Broker>> {
    Arc::new(Mutex::new(Broker::temporary().unwrap()))
}

#[test]
fn test_client_message_wire_format() {
    let msg: ClientMessage = serde_json::from_value(json!({
        "type": "declare_queue",
        "queue": "new-Dogs",
        "options": { "durable": true, "content_type": "text/plain" }
    }))
    .unwrap();
    assert_eq!(
        msg,
        ClientMessage::DeclareQueue {
            queue: "new-Dogs".to_string(),
            options: QueueOptions::durable("text/plain"),
        }
    );

    let msg: ClientMessage =
        serde_json::from_value(json!({ "type": "nack", "delivery_tag": 7, "requeue": false }))
            .unwrap();
    assert_eq!(
        msg,
        ClientMessage::Nack {
            delivery_tag: 7,
            requeue: false
        }
    );

    let list = serde_json::to_value(ClientMessage::ListQueues).unwrap();
    assert_eq!(list, json!({ "type": "list_queues" }));
}

#[test]
fn test_delivery_frame_is_flat() {
    let mut broker = Broker::temporary().unwrap();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let client = crate::client::Client::new(tx);
    let client_id = client.id.clone();
    broker.register_client(client);
    broker
        .declare_queue("q", QueueOptions::durable("text/plain"))
        .unwrap();
    broker.consume("q", &client_id).unwrap();
    broker.publish("q", b"hi".to_vec()).unwrap();

    let frame = serde_json::to_value(rx.try_recv().unwrap()).unwrap();
    assert_eq!(frame["type"], "delivery");
    assert_eq!(frame["queue"], "q");
    assert_eq!(frame["content_type"], "text/plain");
    assert_eq!(frame["body"], json!([104, 105]));
}

#[test]
fn test_handler_turns_broker_errors_into_error_frames() {
    let mut broker = Broker::temporary().unwrap();
    let reply = handle_client_message(
        &mut broker,
        "client-x",
        ClientMessage::Publish {
            queue: "missing".to_string(),
            body: vec![1],
        },
    );
    match reply {
        ServerMessage::Error { message } => assert!(message.contains("missing")),
        other => panic!("Expected Error, got {other:?}"),
    }
}

#[test]
fn test_handler_declare_and_list() {
    let mut broker = Broker::temporary().unwrap();
    let reply = handle_client_message(
        &mut broker,
        "client-x",
        ClientMessage::DeclareQueue {
            queue: "new-Cats".to_string(),
            options: QueueOptions::durable("text/plain"),
        },
    );
    assert!(matches!(reply, ServerMessage::QueueDeclared { ref queue } if queue.name == "new-Cats"));

    match handle_client_message(&mut broker, "client-x", ClientMessage::ListQueues) {
        ServerMessage::Queues { queues } => {
            assert_eq!(queues.len(), 1);
            assert_eq!(queues[0].name, "new-Cats");
        }
        other => panic!("Expected Queues, got {other:?}"),
    }
}

#[tokio::test]
async fn test_local_channel_publish_consume_ack() {
    let broker = shared_broker();
    let mut producer = LocalChannel::connect(broker.clone());
    let mut consumer = LocalChannel::connect(broker.clone());

    producer
        .declare_queue("new-Dogs", QueueOptions::durable("text/plain"))
        .await
        .unwrap();
    let id = producer.publish("new-Dogs", b"Rex".to_vec()).await.unwrap();

    consumer.qos(1).await.unwrap();
    consumer.consume("new-Dogs").await.unwrap();
    let delivery = consumer.next_delivery().await.unwrap();
    assert_eq!(delivery.message_id, id);
    assert_eq!(delivery.body, b"Rex");

    consumer.ack(delivery.delivery_tag).await.unwrap();
    let info = lock(&broker).queue_info("new-Dogs").unwrap();
    assert_eq!(info.message_count, 0);
}

#[tokio::test]
async fn test_local_channel_reports_broker_rejection() {
    let broker = shared_broker();
    let mut channel = LocalChannel::connect(broker);
    let err = channel.consume("nowhere").await.unwrap_err();
    assert!(matches!(err, ChannelError::Broker(message) if message.contains("nowhere")));
}

#[tokio::test]
async fn test_local_channel_close_requeues_and_is_idempotent() {
    let broker = shared_broker();
    let mut producer = LocalChannel::connect(broker.clone());
    producer
        .declare_queue("q", QueueOptions::durable("text/plain"))
        .await
        .unwrap();
    producer.publish("q", b"x".to_vec()).await.unwrap();

    let mut consumer = LocalChannel::connect(broker.clone());
    consumer.consume("q").await.unwrap();
    let first = consumer.next_delivery().await.unwrap();
    assert!(!first.redelivered);

    consumer.close().await.unwrap();
    consumer.close().await.unwrap();
    assert!(consumer.client_id().is_none());
    assert!(matches!(
        consumer.next_delivery().await,
        Err(ChannelError::Closed)
    ));

    let mut again = LocalChannel::connect(broker.clone());
    again.consume("q").await.unwrap();
    let second = again.next_delivery().await.unwrap();
    assert!(second.redelivered);
    assert_eq!(second.message_id, first.message_id);
}

#[tokio::test]
async fn test_dropping_local_channel_cleans_up() {
    let broker = shared_broker();
    let channel = LocalChannel::connect(broker.clone());
    let client_id = channel.client_id().unwrap().to_string();
    assert!(lock(&broker).clients.contains_key(&client_id));

    drop(channel);
    assert!(!lock(&broker).clients.contains_key(&client_id));
}
