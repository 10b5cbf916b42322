use crate::config::PublisherSettings;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::trace;

/// Fire-and-forget delivery of a payload to a bus topic
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>);
}

/// Message sent through a [`BroadcastPublisher`]
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

/// In-process publisher that fans messages out to broadcast subscribers
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<PublishedMessage>,
}

impl BroadcastPublisher {
    /// Create a publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn from_config(settings: &PublisherSettings) -> Self {
        Self::new(settings.channel_capacity)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PublishedMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::from_config(&PublisherSettings::default())
    }
}

#[async_trait]
impl MessagePublisher for BroadcastPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) {
        let message = PublishedMessage {
            topic: topic.to_string(),
            payload,
            published_at: chrono::Utc::now(),
        };

        // No subscribers is acceptable for fire-and-forget delivery
        if self.sender.send(message).is_err() {
            trace!(topic = %topic, "Published message had no subscribers");
        }
    }
}
