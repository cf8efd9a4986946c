//! AMQP queue consumer.
//!
//! [`ImageConsumer`] owns the broker connection. Deliveries are pulled one
//! at a time with prefetch 1 and each is settled before the next is read,
//! so at most one job is in flight per process.

use futures::StreamExt;
use lapin::options::{
    BasicConsumeOptions, BasicPublishOptions, BasicQosOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::config::ConsumerConfig;
use crate::handler::JobHandler;
use crate::reconnect::{reconnect_loop, ReconnectConfig};

/// Consumer tag announced to the broker.
const CONSUMER_TAG: &str = "stolink-image-worker";

/// AMQP persistent delivery mode.
const PERSISTENT: u8 = 2;

/// Error type for broker operations.
#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    #[error("Failed to connect to RabbitMQ: {0}")]
    Connection(#[source] lapin::Error),

    #[error("AMQP channel error: {0}")]
    Channel(#[source] lapin::Error),

    #[error("Not connected to RabbitMQ")]
    NotConnected,

    #[error("Delivery stream closed by the broker")]
    StreamClosed,

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

struct Session {
    connection: Connection,
    channel: Channel,
}

async fn apply_prefetch(channel: &Channel, prefetch: u16) -> Result<(), ConsumerError> {
    channel
        .basic_qos(prefetch, BasicQosOptions::default())
        .await
        .map_err(ConsumerError::Channel)?;
    tracing::debug!(prefetch, "Prefetch limit set");
    Ok(())
}

async fn close_session(session: Session) {
    if session.connection.status().connected() {
        if let Err(e) = session.connection.close(200, "shutdown").await {
            tracing::warn!(error = %e, "Error while closing RabbitMQ connection");
        }
    }
}

/// Consumer for the image job queue.
pub struct ImageConsumer {
    config: ConsumerConfig,
    reconnect: ReconnectConfig,
    session: RwLock<Option<Session>>,
}

impl ImageConsumer {
    pub fn new(config: ConsumerConfig) -> Self {
        Self {
            config,
            reconnect: ReconnectConfig::default(),
            session: RwLock::new(None),
        }
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn queue(&self) -> &str {
        &self.config.queue
    }

    /// Open a connection and channel, declare the durable queue and apply
    /// the prefetch limit.
    ///
    /// The session becomes visible to [`is_connected`](Self::is_connected)
    /// and [`publish`](Self::publish) only once every setup step has
    /// succeeded; a failed attempt closes its half-open connection.
    pub async fn connect(&self) -> Result<(), ConsumerError> {
        let connection =
            Connection::connect(&self.config.amqp_url(), ConnectionProperties::default())
                .await
                .map_err(ConsumerError::Connection)?;

        let channel = match self.prepare_channel(&connection).await {
            Ok(channel) => channel,
            Err(e) => {
                if let Err(close_err) = connection.close(200, "setup failed").await {
                    tracing::debug!(error = %close_err, "Error closing half-open connection");
                }
                return Err(e);
            }
        };

        let previous = self.session.write().await.replace(Session {
            connection,
            channel,
        });
        if let Some(stale) = previous {
            close_session(stale).await;
        }

        tracing::info!(
            endpoint = %self.config.endpoint(),
            queue = %self.config.queue,
            prefetch = self.config.prefetch,
            "RabbitMQ connected",
        );
        Ok(())
    }

    async fn prepare_channel(&self, connection: &Connection) -> Result<Channel, ConsumerError> {
        let channel = connection
            .create_channel()
            .await
            .map_err(ConsumerError::Channel)?;

        channel
            .queue_declare(
                &self.config.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(ConsumerError::Channel)?;

        apply_prefetch(&channel, self.config.prefetch).await?;
        Ok(channel)
    }

    /// Cap the number of unacknowledged deliveries held at once.
    pub async fn set_concurrency_limit(&self, prefetch: u16) -> Result<(), ConsumerError> {
        let channel = self.channel().await?;
        apply_prefetch(&channel, prefetch).await
    }

    pub async fn is_connected(&self) -> bool {
        match self.session.read().await.as_ref() {
            Some(session) => {
                session.connection.status().connected() && session.channel.status().connected()
            }
            None => false,
        }
    }

    async fn channel(&self) -> Result<Channel, ConsumerError> {
        match self.session.read().await.as_ref() {
            Some(session) if session.channel.status().connected() => Ok(session.channel.clone()),
            _ => Err(ConsumerError::NotConnected),
        }
    }

    /// Close the connection if one is open. Safe to call repeatedly.
    pub async fn disconnect(&self) {
        let session = self.session.write().await.take();
        if let Some(session) = session {
            close_session(session).await;
            tracing::info!("RabbitMQ disconnected");
        }
    }

    /// Publish a persistent message to the image queue via the default
    /// exchange.
    pub async fn publish(&self, payload: &serde_json::Value) -> Result<(), ConsumerError> {
        let channel = self.channel().await?;
        let body = serde_json::to_vec(payload)?;

        channel
            .basic_publish(
                "",
                &self.config.queue,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default()
                    .with_delivery_mode(PERSISTENT)
                    .with_content_type("application/json".into()),
            )
            .await
            .map_err(ConsumerError::Channel)?
            .await
            .map_err(ConsumerError::Channel)?;

        tracing::info!(queue = %self.config.queue, bytes = body.len(), "Message published");
        Ok(())
    }

    /// Deliver messages to `handler` one at a time until `cancel` fires or
    /// the stream fails.
    ///
    /// Cancellation is observed only between deliveries, so a job that has
    /// started always runs to its callback and ack.
    pub async fn consume(
        &self,
        handler: &JobHandler,
        cancel: &CancellationToken,
    ) -> Result<(), ConsumerError> {
        let channel = self.channel().await?;
        let mut deliveries = channel
            .basic_consume(
                &self.config.queue,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(ConsumerError::Channel)?;

        tracing::info!(queue = %self.config.queue, "Waiting for image jobs");

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Consumer stopping");
                    return Ok(());
                }
                next = deliveries.next() => next,
            };

            let delivery = match next {
                Some(Ok(delivery)) => delivery,
                Some(Err(e)) => return Err(ConsumerError::Channel(e)),
                None => return Err(ConsumerError::StreamClosed),
            };

            match handler.handle_delivery(&delivery.data, &delivery.acker).await {
                Ok(disposition) => tracing::debug!(
                    delivery_tag = delivery.delivery_tag,
                    ?disposition,
                    "Delivery settled",
                ),
                Err(e) => tracing::error!(
                    delivery_tag = delivery.delivery_tag,
                    error = %e,
                    "Failed to settle delivery",
                ),
            }
        }
    }

    /// Connect (retrying with backoff), consume, and reconnect whenever the
    /// stream drops, until `cancel` fires. Disconnects before returning.
    pub async fn run(&self, handler: JobHandler, cancel: CancellationToken) {
        let endpoint = self.config.endpoint();

        while !cancel.is_cancelled() {
            if !self.is_connected().await {
                self.disconnect().await;
                let connected =
                    reconnect_loop(&endpoint, &self.reconnect, &cancel, || self.connect()).await;
                if connected.is_none() {
                    break;
                }
            }

            match self.consume(&handler, &cancel).await {
                Ok(()) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Lost RabbitMQ consumer, reconnecting");
                    self.disconnect().await;
                }
            }
        }

        self.disconnect().await;
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn unreachable_consumer() -> ImageConsumer {
        ImageConsumer::new(ConsumerConfig {
            host: "127.0.0.1".into(),
            port: 1,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn failed_connect_leaves_consumer_disconnected() {
        let consumer = unreachable_consumer();

        assert_matches!(consumer.connect().await, Err(ConsumerError::Connection(_)));
        assert!(!consumer.is_connected().await);
    }

    #[tokio::test]
    async fn publish_requires_a_ready_session() {
        let consumer = unreachable_consumer();
        let _ = consumer.connect().await;

        assert_matches!(
            consumer.publish(&json!({ "jobId": "j1" })).await,
            Err(ConsumerError::NotConnected)
        );
        assert_matches!(
            consumer.set_concurrency_limit(1).await,
            Err(ConsumerError::NotConnected)
        );
    }

    #[tokio::test]
    async fn disconnect_without_session_is_a_no_op() {
        let consumer = unreachable_consumer();
        consumer.disconnect().await;
        consumer.disconnect().await;
        assert!(!consumer.is_connected().await);
    }
}
