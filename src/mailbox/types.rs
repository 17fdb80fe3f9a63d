//! Mailbox domain types.

use serde::{Deserialize, Serialize};

/// Attachment metadata inlined with a fetched message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    /// Display name; its extension drives text extraction.
    pub name: String,
}

impl Attachment {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// An unread message with its attachments, in the order the API returned them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub subject: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Message {
    pub fn new(id: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            attachments: Vec::new(),
        }
    }

    /// Append an attachment (builder style).
    pub fn with_attachment(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.attachments.push(Attachment::new(id, name));
        self
    }
}
