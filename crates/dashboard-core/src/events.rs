//! Typed notification channel between the poller and its consumers

use gptmaker_api::Chat;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

const BUFFER_SIZE: usize = 100;

/// A chat that received messages since the last tick
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatWithNewMessages {
    pub chat: Chat,
    pub new_messages_count: u32,
}

/// Signals emitted by the change-detection loop, at most one of each per tick
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum DashboardEvent {
    #[serde(rename_all = "camelCase")]
    NewChatsDetected {
        new_chats: Vec<Chat>,
        all_chats: Vec<Chat>,
    },
    #[serde(rename_all = "camelCase")]
    NewMessagesDetected {
        chats_with_new_messages: Vec<ChatWithNewMessages>,
    },
}

impl DashboardEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewChatsDetected { .. } => "new-chats-detected",
            Self::NewMessagesDetected { .. } => "new-messages-detected",
        }
    }
}

/// Broadcast channel that fans dashboard events out to every subscriber
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DashboardEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            sender: broadcast::channel(capacity).0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.sender.subscribe()
    }

    /// Publish an event, returning how many subscribers received it
    pub fn emit(&self, event: DashboardEvent) -> usize {
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!(event = name, "No subscribers for dashboard event");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chat(id: &str) -> Chat {
        Chat {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_emit_delivers_to_all_subscribers() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let event = DashboardEvent::NewChatsDetected {
            new_chats: vec![chat("a")],
            all_chats: vec![chat("a"), chat("b")],
        };
        assert_eq!(bus.emit(event.clone()), 2);

        assert_eq!(rx1.try_recv().unwrap(), event);
        assert_eq!(rx2.try_recv().unwrap(), event);
    }

    #[test]
    fn test_emit_without_subscribers_is_noop() {
        let bus = EventBus::new();
        let delivered = bus.emit(DashboardEvent::NewMessagesDetected {
            chats_with_new_messages: vec![],
        });
        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = DashboardEvent::NewMessagesDetected {
            chats_with_new_messages: vec![ChatWithNewMessages {
                chat: chat("c1"),
                new_messages_count: 3,
            }],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "new-messages-detected");
        assert_eq!(json["chatsWithNewMessages"][0]["newMessagesCount"], 3);
        assert_eq!(json["chatsWithNewMessages"][0]["chat"]["id"], "c1");
        assert_eq!(event.name(), "new-messages-detected");
    }
}
