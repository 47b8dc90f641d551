use crate::broker::{Broker, QueueOptions, lock};
use crate::transport::channel::BrokerChannel;
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::transport::websocket::serve;
use crate::transport::ws_channel::WsChannel;
use crate::utils::error::ChannelError;
use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as WsMessage;

const CT: &str = "text/plain";

async fn setup_server() -> (u16, Arc<Mutex<Broker>>) {
    let broker = Arc::new(Mutex::new(Broker::temporary().unwrap()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(serve(listener, broker.clone()));
    (port, broker)
}

async fn wait_for<F: Fn(&Broker) -> bool>(broker: &Arc<Mutex<Broker>>, condition: F) {
    for _ in 0..100 {
        if condition(&lock(broker)) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn test_publish_and_consume_over_websocket() {
    let (port, broker) = setup_server().await;
    let mut producer = WsChannel::connect("127.0.0.1", port).await.unwrap();
    let mut consumer = WsChannel::connect("127.0.0.1", port).await.unwrap();

    producer
        .declare_queue("new-Cats", QueueOptions::durable(CT))
        .await
        .unwrap();
    for body in ["Tom", "Felix"] {
        producer
            .publish("new-Cats", body.as_bytes().to_vec())
            .await
            .unwrap();
    }

    consumer.qos(1).await.unwrap();
    consumer.consume("new-Cats").await.unwrap();

    let first = consumer.next_delivery().await.unwrap();
    assert_eq!(first.body, b"Tom");
    assert_eq!(first.content_type, CT);
    consumer.ack(first.delivery_tag).await.unwrap();

    let second = consumer.next_delivery().await.unwrap();
    assert_eq!(second.body, b"Felix");
    consumer.ack(second.delivery_tag).await.unwrap();

    assert_eq!(lock(&broker).queue_info("new-Cats").unwrap().message_count, 0);

    producer.close().await.unwrap();
    consumer.close().await.unwrap();
}

#[tokio::test]
async fn test_broker_errors_reach_the_client() {
    let (port, _broker) = setup_server().await;
    let mut channel = WsChannel::connect("127.0.0.1", port).await.unwrap();
    channel
        .declare_queue("new-Dogs", QueueOptions::durable(CT))
        .await
        .unwrap();

    let err = channel
        .declare_queue("new-Dogs", QueueOptions::transient(CT))
        .await
        .unwrap_err();
    assert!(matches!(err, ChannelError::Broker(_)));

    // The connection survives a rejected request.
    let queues = channel.list_queues().await.unwrap();
    assert_eq!(queues.len(), 1);
}

#[tokio::test]
async fn test_invalid_frame_gets_error_reply() {
    let (port, _broker) = setup_server().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://127.0.0.1:{port}"))
        .await
        .unwrap();

    ws.send(WsMessage::text("{\"type\":\"subscribe\"}"))
        .await
        .unwrap();
    let frame = ws.next().await.unwrap().unwrap();
    let reply: ServerMessage = serde_json::from_slice(&frame.into_data()).unwrap();
    assert!(matches!(reply, ServerMessage::Error { message } if message.starts_with("invalid request")));

    let list = serde_json::to_string(&ClientMessage::ListQueues).unwrap();
    ws.send(WsMessage::text(list)).await.unwrap();
    let frame = ws.next().await.unwrap().unwrap();
    let reply: ServerMessage = serde_json::from_slice(&frame.into_data()).unwrap();
    assert!(matches!(reply, ServerMessage::Queues { .. }));
}

#[tokio::test]
async fn test_disconnect_requeues_unacked() {
    let (port, broker) = setup_server().await;
    let mut producer = WsChannel::connect("127.0.0.1", port).await.unwrap();
    producer
        .declare_queue("new-Dogs", QueueOptions::durable(CT))
        .await
        .unwrap();
    producer
        .publish("new-Dogs", b"Rex".to_vec())
        .await
        .unwrap();

    let mut consumer = WsChannel::connect("127.0.0.1", port).await.unwrap();
    consumer.consume("new-Dogs").await.unwrap();
    let delivery = consumer.next_delivery().await.unwrap();
    assert!(!delivery.redelivered);
    consumer.close().await.unwrap();

    wait_for(&broker, |b| b.clients.len() == 1).await;

    let mut again = WsChannel::connect("127.0.0.1", port).await.unwrap();
    again.consume("new-Dogs").await.unwrap();
    let redelivered = again.next_delivery().await.unwrap();
    assert!(redelivered.redelivered);
    assert_eq!(redelivered.message_id, delivery.message_id);
}

#[tokio::test]
async fn test_connect_failure_names_host() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = match WsChannel::connect("127.0.0.1", port).await {
        Ok(_) => panic!("Expected a connection error"),
        Err(e) => e,
    };
    match &err {
        ChannelError::Connection { host, .. } => assert_eq!(host, &format!("127.0.0.1:{port}")),
        other => panic!("Expected Connection, got {other:?}"),
    }
    assert!(err.to_string().contains(&format!("127.0.0.1:{port}")));
}

#[tokio::test]
async fn test_closed_channel_rejects_requests() {
    let (port, _broker) = setup_server().await;
    let mut channel = WsChannel::connect("127.0.0.1", port).await.unwrap();
    channel.close().await.unwrap();
    channel.close().await.unwrap();
    assert!(matches!(
        channel.list_queues().await,
        Err(ChannelError::Closed)
    ));
}
