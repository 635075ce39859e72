//! Transport boundary types.
//!
//! The chat protocol itself is an external collaborator; the core only
//! depends on this interface. Inbound events carry an opaque respondent
//! identity plus a payload kind; outbound messages carry text and optional
//! interactive choices identified by callback data.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque, stable respondent identity supplied by the transport layer.
///
/// Used as the primary key for every owned record; never merged or renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RespondentId(pub i64);

impl std::fmt::Display for RespondentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Display identity attached to inbound events by the transport layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RespondentProfile {
    pub username: Option<String>,
    pub first_name: Option<String>,
}

impl RespondentProfile {
    /// Human-readable name for reviewer-facing summaries.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.username) {
            (Some(first), Some(user)) => format!("{first} (@{user})"),
            (Some(first), None) => first.clone(),
            (None, Some(user)) => format!("@{user}"),
            (None, None) => "unknown".to_string(),
        }
    }
}

/// Payload of one inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    /// A slash command, without the leading slash (e.g. "start").
    Command(String),
    /// Free-form text.
    Text(String),
    /// An interactive button press, carrying its callback data.
    Button(String),
    /// A photo upload; the reference is transport-opaque.
    Photo { file_ref: String },
    /// A document upload with its MIME type, if known.
    Document {
        file_ref: String,
        mime_type: Option<String>,
    },
}

/// One inbound event from the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub respondent: RespondentId,
    pub profile: RespondentProfile,
    pub kind: InboundKind,
}

/// An interactive choice attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// Callback data echoed back in a `Button` event.
    pub data: String,
    /// Label shown to the user.
    pub label: String,
}

impl Choice {
    pub fn new(data: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            label: label.into(),
        }
    }
}

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub text: String,
    pub choices: Vec<Choice>,
}

impl Outgoing {
    /// A plain text message with no interactive choices.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            choices: Vec::new(),
        }
    }

    /// A message with interactive choices.
    pub fn with_choices(text: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self {
            text: text.into(),
            choices,
        }
    }
}

/// Opaque reference to a delivered message, usable for retraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef(pub String);

/// Outbound delivery faults, split by actionability.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The recipient has never interacted with the system; the reviewer can
    /// remediate by asking them to start a conversation.
    #[error("recipient has never started a conversation")]
    Unreachable,
    /// Any other delivery fault.
    #[error("delivery failed: {0}")]
    Other(String),
}

/// Outbound capability consumed from the transport layer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Delivers a message to a recipient.
    async fn send(
        &self,
        recipient: RespondentId,
        message: Outgoing,
    ) -> std::result::Result<MessageRef, DeliveryError>;

    /// Retracts a previously delivered message. Best effort; a failure is
    /// logged by callers and never propagated to the respondent.
    async fn retract(
        &self,
        recipient: RespondentId,
        message: &MessageRef,
    ) -> std::result::Result<(), DeliveryError>;
}
