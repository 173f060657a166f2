//! Per-chat snapshots and the comparison that drives change detection

use std::collections::HashMap;

use gptmaker_api::{Chat, Message};
use serde::Serialize;

use crate::events::ChatWithNewMessages;

/// Last-known state of one chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSnapshot {
    /// Epoch milliseconds of the newest message, 0 for an empty thread
    pub last_message_time: i64,
    pub message_count: usize,
}

/// Outcome of comparing a chat against its stored snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatChange {
    New,
    NewMessages { new_messages_count: u32 },
    Unchanged,
}

impl ChatSnapshot {
    pub fn of(chat: &Chat) -> Self {
        Self {
            last_message_time: last_message_time(chat),
            message_count: chat.messages.len(),
        }
    }

    /// Compare a newer observation of the same chat against this one
    ///
    /// Either a later last message or a larger message count is a change.
    /// The reported count is the growth in messages, never less than 1.
    pub fn compare(&self, current: &ChatSnapshot) -> ChatChange {
        let newer = current.last_message_time > self.last_message_time;
        let more = current.message_count > self.message_count;
        if !newer && !more {
            return ChatChange::Unchanged;
        }

        let delta = current.message_count.saturating_sub(self.message_count);
        ChatChange::NewMessages {
            new_messages_count: u32::try_from(delta).unwrap_or(u32::MAX).max(1),
        }
    }
}

/// Timestamp of the chronologically last message of a chat
pub fn last_message_time(chat: &Chat) -> i64 {
    chat.messages
        .iter()
        .map(Message::time_millis)
        .max()
        .unwrap_or(0)
}

/// Chats found new or changed in one pass over the chat list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub new_chats: Vec<Chat>,
    pub chats_with_new_messages: Vec<ChatWithNewMessages>,
    /// Chats skipped for having no usable ID
    pub skipped: usize,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.new_chats.is_empty() && self.chats_with_new_messages.is_empty()
    }
}

/// Snapshot map keyed by chat ID
#[derive(Debug, Default)]
pub struct SnapshotStore {
    snapshots: HashMap<String, ChatSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every chat without reporting anything
    ///
    /// Existing snapshots are overwritten with the current values.
    pub fn record_baseline(&mut self, chats: &[Chat]) -> usize {
        let mut recorded = 0;
        for chat in chats {
            if let Some(id) = chat.chat_id() {
                self.snapshots.insert(id.to_string(), ChatSnapshot::of(chat));
                recorded += 1;
            }
        }
        recorded
    }

    /// Compare a fresh chat list against the stored snapshots
    ///
    /// Unknown chats are reported as new; known chats whose snapshot grew
    /// are reported with their new-message count. Every reported chat has
    /// its snapshot replaced by the current values.
    pub fn diff(&mut self, chats: &[Chat]) -> ChangeSet {
        let mut changes = ChangeSet::default();

        for chat in chats {
            let Some(id) = chat.chat_id() else {
                changes.skipped += 1;
                continue;
            };
            let current = ChatSnapshot::of(chat);

            let change = match self.snapshots.get(id) {
                None => ChatChange::New,
                Some(stored) => stored.compare(&current),
            };

            match change {
                ChatChange::New => {
                    self.snapshots.insert(id.to_string(), current);
                    changes.new_chats.push(chat.clone());
                }
                ChatChange::NewMessages { new_messages_count } => {
                    self.snapshots.insert(id.to_string(), current);
                    changes.chats_with_new_messages.push(ChatWithNewMessages {
                        chat: chat.clone(),
                        new_messages_count,
                    });
                }
                ChatChange::Unchanged => {}
            }
        }

        changes
    }

    pub fn get(&self, chat_id: &str) -> Option<&ChatSnapshot> {
        self.snapshots.get(chat_id)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}
