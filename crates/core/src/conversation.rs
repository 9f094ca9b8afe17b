//! Conversation-related types.

use booksense_model::ModelMessage;
use serde::{Deserialize, Serialize};

/// Who wrote a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person using the chat.
    User,
    /// The generative model.
    Model,
}

/// A message in the transcript.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    /// Author of the message.
    pub role: Role,
    /// Text of the message.
    pub text: String,
}

impl Message {
    /// Creates a message written by the user.
    #[inline]
    pub fn user<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Creates a message written by the model.
    #[inline]
    pub fn model<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

impl From<&Message> for ModelMessage {
    #[inline]
    fn from(msg: &Message) -> Self {
        match msg.role {
            Role::User => ModelMessage::User(msg.text.clone()),
            Role::Model => ModelMessage::Model(msg.text.clone()),
        }
    }
}

/// Represents a conversation.
///
/// The transcript only grows: messages are appended in display order and
/// are never edited or removed.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Conversation {
    items: Vec<Message>,
}

impl Conversation {
    /// Creates a conversation seeded with a welcome message from the model.
    #[inline]
    pub fn with_welcome<S: Into<String>>(welcome: S) -> Self {
        Self {
            items: vec![Message::model(welcome)],
        }
    }

    /// Returns all messages, oldest first.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.items
    }

    /// Returns the number of messages.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if there are no messages.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the most recent message.
    #[inline]
    pub fn last(&self) -> Option<&Message> {
        self.items.last()
    }

    #[inline]
    pub(crate) fn push(&mut self, msg: Message) {
        self.items.push(msg);
    }

    pub(crate) fn to_model_messages(&self) -> Vec<ModelMessage> {
        self.items.iter().map(ModelMessage::from).collect()
    }
}
