//! Conversation message types.
//!
//! Every pane shares one log. A message belongs either to the user, and is
//! shown in every pane, or to exactly one pane.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

const USER_SENDER: &str = "user";

/// Identifier of a response message. User messages have none.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Fresh id for a pane's response in the current turn.
    pub fn generate(pane_id: &str) -> Self {
        Self(format!("{}-{}", pane_id, Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who authored a message.
///
/// Serialized as the plain string `"user"` or the pane id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sender {
    User,
    Pane(String),
}

impl Sender {
    pub fn pane(id: impl Into<String>) -> Self {
        Sender::Pane(id.into())
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Sender::User)
    }

    pub fn is_pane(&self, pane_id: &str) -> bool {
        matches!(self, Sender::Pane(id) if id == pane_id)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Sender::User => USER_SENDER,
            Sender::Pane(id) => id,
        }
    }
}

impl Serialize for Sender {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Sender {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(if raw == USER_SENDER {
            Sender::User
        } else {
            Sender::Pane(raw)
        })
    }
}

/// Base64-encoded image carried by a prompt or a generated reply.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub mime_type: String,
    /// Base64 data without any `data:` prefix.
    pub data: String,
}

impl ImagePayload {
    pub fn png(data: impl Into<String>) -> Self {
        Self {
            mime_type: "image/png".to_string(),
            data: data.into(),
        }
    }

    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: BASE64_STANDARD.encode(bytes),
        }
    }

    /// Accepts either a bare base64 string or a `data:<mime>;base64,<data>` URL.
    pub fn from_data_url(value: &str) -> Self {
        match value
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
        {
            Some((mime, data)) => Self {
                mime_type: mime.to_string(),
                data: data.to_string(),
            },
            None => Self::png(value),
        }
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn decode(&self) -> Option<Vec<u8>> {
        BASE64_STANDARD.decode(&self.data).ok()
    }
}

// Payloads can be megabytes of base64; keep Debug output readable.
impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// A single entry in the shared conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    pub sender: Sender,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImagePayload>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(prompt: &Prompt) -> Self {
        Self {
            id: None,
            sender: Sender::User,
            text: prompt.text.clone(),
            image: prompt.image.clone(),
            timestamp: Utc::now(),
        }
    }

    /// Empty response record appended before the pane's request starts.
    pub fn placeholder(id: MessageId, pane_id: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            sender: Sender::Pane(pane_id.into()),
            text: String::new(),
            image: None,
            timestamp: Utc::now(),
        }
    }

    /// Whether the message is shown in the given pane.
    pub fn visible_in(&self, pane_id: &str) -> bool {
        self.sender.is_user() || self.sender.is_pane(pane_id)
    }

    pub fn apply(&mut self, patch: MessagePatch) {
        if let Some(text) = patch.text {
            self.text = text;
        }
        if let Some(image) = patch.image {
            self.image = Some(image);
        }
    }
}

/// Partial update for a response message; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePatch {
    pub text: Option<String>,
    pub image: Option<ImagePayload>,
}

impl MessagePatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            image: None,
        }
    }

    pub fn with_image(mut self, image: ImagePayload) -> Self {
        self.image = Some(image);
        self
    }

    /// Text shown in a pane whose request failed.
    pub fn error(err: &impl fmt::Display) -> Self {
        Self::text(format!("Error: {err}"))
    }
}

/// What the user submitted for one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub image: Option<ImagePayload>,
    /// Ask text models for web-augmented answers.
    pub web_search: bool,
}

impl Prompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
            web_search: false,
        }
    }

    pub fn with_image(mut self, image: ImagePayload) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.image.is_none()
    }
}
