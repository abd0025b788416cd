//! Chat payload carried inside data frames.

use serde::{Deserialize, Serialize};

/// `{"username": ..., "msg": ...}`, the plaintext of every chat data frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Display name chosen by the sender.
    pub username: String,
    /// Message text.
    pub msg: String,
}

impl ChatMessage {
    /// Build a message from its two fields.
    pub fn new(username: impl Into<String>, msg: impl Into<String>) -> Self {
        Self { username: username.into(), msg: msg.into() }
    }

    /// Serialize to the UTF-8 JSON payload.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Parse a UTF-8 JSON payload.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
