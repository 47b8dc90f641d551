//! Request handling shared by every transport.

use tracing::warn;

use crate::broker::Broker;
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::utils::error::BrokerError;

/// Apply one client request to the broker and build its reply. Broker
/// errors become an `error` frame; the connection stays usable.
pub fn handle_client_message(
    broker: &mut Broker,
    client_id: &str,
    msg: ClientMessage,
) -> ServerMessage {
    match apply(broker, client_id, msg) {
        Ok(reply) => reply,
        Err(e) => {
            warn!(client = %client_id, error = %e, "request rejected");
            ServerMessage::Error {
                message: e.to_string(),
            }
        }
    }
}

fn apply(
    broker: &mut Broker,
    client_id: &str,
    msg: ClientMessage,
) -> Result<ServerMessage, BrokerError> {
    let reply = match msg {
        ClientMessage::DeclareQueue { queue, options } => ServerMessage::QueueDeclared {
            queue: broker.declare_queue(&queue, options)?,
        },
        ClientMessage::DeleteQueue { queue } => {
            let message_count = broker.delete_queue(&queue)?;
            ServerMessage::QueueDeleted {
                queue,
                message_count,
            }
        }
        ClientMessage::PurgeQueue { queue } => {
            let message_count = broker.purge_queue(&queue)?;
            ServerMessage::QueuePurged {
                queue,
                message_count,
            }
        }
        ClientMessage::ListQueues => ServerMessage::Queues {
            queues: broker.list_queues(),
        },
        ClientMessage::Publish { queue, body } => ServerMessage::Published {
            message_id: broker.publish(&queue, body)?,
        },
        ClientMessage::Qos { prefetch } => {
            broker.set_prefetch(client_id, prefetch)?;
            ServerMessage::QosOk { prefetch }
        }
        ClientMessage::Consume { queue } => ServerMessage::ConsumeOk {
            consumer_tag: broker.consume(&queue, client_id)?,
        },
        ClientMessage::Ack { delivery_tag } => {
            broker.ack(client_id, delivery_tag)?;
            ServerMessage::Acked { delivery_tag }
        }
        ClientMessage::Nack {
            delivery_tag,
            requeue,
        } => {
            broker.nack(client_id, delivery_tag, requeue)?;
            ServerMessage::Nacked { delivery_tag }
        }
    };
    Ok(reply)
}
