//! Runtime packets and their serialised wire form.

use std::sync::Arc;

use dashmap::DashMap;
use rkyv::{Archive, Deserialize, Serialize};

use crate::message::Message;
use crate::value::Value;

/// The serialised form of one request or reply envelope.
#[derive(Archive, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WirePacket {
    /// Messages in wire order.
    pub messages: Vec<WireMessage>,
}

/// The serialised form of one message.
#[derive(Archive, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WireMessage {
    /// Dot-delimited target identifier, e.g. `"pizza.order"`.
    pub target_uri: String,
    /// Client-assigned response URI, echoed in the reply.
    pub response_uri: String,
    /// Ordered call arguments.
    pub arguments: Vec<Value>,
}

/// One decoded request envelope.
///
/// A packet lives for exactly one request/response cycle. Its message
/// sequence is fixed at decode; the scratch map is the only part middleware
/// and handlers may mutate, and the chain's strict sequencing makes those
/// mutations deterministic.
#[derive(Debug, Default)]
pub struct Packet {
    messages: Vec<Arc<Message>>,
    scratch: DashMap<String, Value>,
}

impl Packet {
    /// Creates a packet from decoded messages.
    #[must_use]
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages: messages.into_iter().map(Arc::new).collect(),
            scratch: DashMap::new(),
        }
    }

    /// The messages in wire order.
    #[must_use]
    pub fn messages(&self) -> &[Arc<Message>] {
        &self.messages
    }

    /// Sets a scratch entry, returning the previous value if present.
    pub fn set_scratch(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.scratch.insert(key.into(), value)
    }

    /// Reads a scratch entry.
    #[must_use]
    pub fn scratch(&self, key: &str) -> Option<Value> {
        self.scratch.get(key).map(|entry| entry.value().clone())
    }

    /// Mutates a scratch entry in place if present, returning whether it
    /// was found.
    pub fn update_scratch(&self, key: &str, f: impl FnOnce(&mut Value)) -> bool {
        match self.scratch.get_mut(key) {
            Some(mut entry) => {
                f(entry.value_mut());
                true
            }
            None => false,
        }
    }

    /// Builds the reply envelope from the recorded responses.
    ///
    /// Answered messages produce one reply message each, addressed at
    /// `"{response_uri}/onResult"`; unanswered messages are omitted.
    #[must_use]
    pub fn reply(&self) -> WirePacket {
        let messages = self
            .messages
            .iter()
            .filter_map(|message| {
                message.response().map(|value| WireMessage {
                    target_uri: format!("{}/onResult", message.response_uri()),
                    response_uri: String::new(),
                    arguments: vec![value.clone()],
                })
            })
            .collect();

        WirePacket { messages }
    }
}

impl From<WirePacket> for Packet {
    fn from(wire: WirePacket) -> Self {
        Self::new(
            wire.messages
                .into_iter()
                .map(|m| Message::new(m.target_uri, m.response_uri, m.arguments))
                .collect(),
        )
    }
}
