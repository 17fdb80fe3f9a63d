//! Mailbox abstraction over the remote mail API.
//!
//! The [`Mailbox`] trait is infallible by contract: every implementation
//! catches and logs its own failures and degrades to "no result" (empty list,
//! empty text, no-op). The worker never sees a mailbox error.

pub mod auth;
pub mod graph;
pub mod types;

use std::path::Path;

use async_trait::async_trait;

pub use graph::{GraphConfig, GraphMailbox};
pub use types::{Attachment, Message};

/// Operations the polling worker needs from a mailbox.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Unread messages that carry attachments, in the scanned folder.
    ///
    /// Empty on any remote failure.
    async fn list_unread_with_attachments(&self) -> Vec<Message>;

    /// Plain text of a PDF/DOCX attachment.
    ///
    /// Empty when the attachment is unsupported, unreadable, or the fetch
    /// fails. Any temporary file used is gone when this returns.
    async fn get_attachment_text(&self, message_id: &str, attachment_id: &str) -> String;

    /// Save an attachment's bytes to `destination`, creating parent
    /// directories and overwriting an existing file.
    async fn download_attachment(&self, message_id: &str, attachment_id: &str, destination: &Path);

    /// Set the message's read flag.
    async fn mark_as_read(&self, message_id: &str);

    /// Move the message to the folder with the given name.
    async fn move_message(&self, message_id: &str, destination_folder: &str);
}
