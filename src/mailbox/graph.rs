//! Microsoft Graph mailbox client.
//!
//! Each public operation has a fallible counterpart (`fetch_unread`,
//! `attachment_text`, `save_attachment`, `set_read`, `move_to_folder`) that
//! returns the typed error. The [`Mailbox`] impl wraps those and logs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::MailboxError;
use crate::extract::{DocumentExtractor, DocumentKind};
use crate::mailbox::auth::TokenProvider;
use crate::mailbox::{Attachment, Mailbox, Message};

/// `$filter` selecting unread mail with attachments (pre-encoded).
const UNREAD_WITH_ATTACHMENTS: &str = "isRead%20eq%20false%20and%20hasAttachments%20eq%20true";

/// `$expand` inlining attachment metadata without the content bytes.
const EXPAND_ATTACHMENT_METADATA: &str = "attachments($select=id,name)";

const FILE_ATTACHMENT_TYPE: &str = "#microsoft.graph.fileAttachment";

/// Upper bound on pages in one listing; longer chains are an error.
const MAX_PAGES: usize = 50;

/// Folder names Graph accepts directly as a move destination.
const WELL_KNOWN_FOLDERS: &[&str] = &[
    "archive",
    "clutter",
    "conflicts",
    "conversationhistory",
    "deleteditems",
    "drafts",
    "inbox",
    "junkemail",
    "localfailures",
    "msgfolderroot",
    "outbox",
    "recoverableitemsdeletions",
    "scheduled",
    "searchfolders",
    "sentitems",
    "serverfailures",
    "syncissues",
];

/// Graph connection settings.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    /// Address of the mailbox being scanned.
    pub mailbox: String,
    /// Folder to scan (well-known name or folder id).
    pub folder: String,
    /// API base, e.g. `https://graph.microsoft.com/v1.0`.
    pub graph_url: String,
    pub authority_url: String,
    /// Where temporary files for text extraction are created.
    pub scratch_dir: PathBuf,
}

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Deserialize)]
struct GraphMessage {
    id: String,
    subject: Option<String>,
    #[serde(default)]
    attachments: Vec<GraphAttachmentMeta>,
}

#[derive(Deserialize)]
struct GraphAttachmentMeta {
    id: String,
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphAttachment {
    #[serde(rename = "@odata.type")]
    odata_type: Option<String>,
    name: Option<String>,
    content_bytes: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphFolder {
    id: String,
    display_name: Option<String>,
}

impl From<GraphMessage> for Message {
    fn from(m: GraphMessage) -> Self {
        Self {
            id: m.id,
            subject: m.subject.unwrap_or_default(),
            attachments: m
                .attachments
                .into_iter()
                .map(|a| Attachment {
                    id: a.id,
                    name: a.name.unwrap_or_default(),
                })
                .collect(),
        }
    }
}

/// A downloaded file attachment.
#[derive(Debug, Clone)]
pub struct FileAttachment {
    pub name: String,
    pub bytes: Vec<u8>,
}

// ── Client ──────────────────────────────────────────────────────────

/// Mailbox backed by the Microsoft Graph REST API.
pub struct GraphMailbox {
    config: GraphConfig,
    client: reqwest::Client,
    tokens: TokenProvider,
    extractor: Arc<dyn DocumentExtractor>,
    /// Display name (lower-cased) → folder id.
    folder_ids: Mutex<HashMap<String, String>>,
}

impl GraphMailbox {
    pub fn new(config: GraphConfig, extractor: Arc<dyn DocumentExtractor>) -> Self {
        Self::with_client(config, extractor, reqwest::Client::new())
    }

    /// Build with a caller-supplied HTTP client.
    pub fn with_client(
        config: GraphConfig,
        extractor: Arc<dyn DocumentExtractor>,
        client: reqwest::Client,
    ) -> Self {
        let tokens = TokenProvider::new(
            client.clone(),
            &config.authority_url,
            &config.tenant_id,
            config.client_id.clone(),
            config.client_secret.clone(),
        );
        Self {
            config,
            client,
            tokens,
            extractor,
            folder_ids: Mutex::new(HashMap::new()),
        }
    }

    /// `{graph_url}/users/{mailbox}/<segments...>`, each segment escaped.
    fn user_url(&self, segments: &[&str]) -> Result<Url, MailboxError> {
        let mut url = Url::parse(&self.config.graph_url).map_err(|e| MailboxError::Request {
            op: "build_url".into(),
            reason: format!("invalid Graph URL {:?}: {e}", self.config.graph_url),
        })?;
        url.path_segments_mut()
            .map_err(|_| MailboxError::Request {
                op: "build_url".into(),
                reason: format!("Graph URL {:?} cannot be a base", self.config.graph_url),
            })?
            .pop_if_empty()
            .push("users")
            .push(&self.config.mailbox)
            .extend(segments);
        Ok(url)
    }

    /// Attach a bearer token, send, and reject non-2xx responses.
    async fn send(
        &self,
        op: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, MailboxError> {
        let token = self.tokens.token().await?;
        let resp = request
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|e| MailboxError::Request {
                op: op.into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                self.tokens.invalidate().await;
            }
            let body = resp.text().await.unwrap_or_default();
            return Err(MailboxError::Status {
                op: op.into(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn read_json<T: DeserializeOwned>(
        op: &str,
        resp: reqwest::Response,
    ) -> Result<T, MailboxError> {
        resp.json().await.map_err(|e| MailboxError::InvalidResponse {
            op: op.into(),
            reason: e.to_string(),
        })
    }

    /// GET a collection, following `@odata.nextLink` until exhausted.
    ///
    /// All or nothing: a failed page, or a chain longer than `MAX_PAGES`,
    /// fails the whole listing.
    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        op: &str,
        first: Url,
    ) -> Result<Vec<T>, MailboxError> {
        let mut items = Vec::new();
        let mut next = Some(first.to_string());
        let mut pages = 0;

        while let Some(url) = next.take() {
            if pages == MAX_PAGES {
                return Err(MailboxError::InvalidResponse {
                    op: op.into(),
                    reason: format!("more than {MAX_PAGES} pages of results"),
                });
            }
            let resp = self.send(op, self.client.get(&url)).await?;
            let page: Page<T> = Self::read_json(op, resp).await?;
            items.extend(page.value);
            next = page.next_link;
            pages += 1;
        }

        Ok(items)
    }

    /// Fetch unread messages with attachments from the configured folder.
    pub async fn fetch_unread(&self) -> Result<Vec<Message>, MailboxError> {
        let mut url = self.user_url(&["mailFolders", &self.config.folder, "messages"])?;
        url.set_query(Some(&format!(
            "$filter={UNREAD_WITH_ATTACHMENTS}&$expand={EXPAND_ATTACHMENT_METADATA}"
        )));

        let messages: Vec<GraphMessage> = self.get_all_pages("list_messages", url).await?;
        Ok(messages.into_iter().map(Message::from).collect())
    }

    /// Fetch a single attachment's content.
    pub async fn fetch_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<FileAttachment, MailboxError> {
        let url = self.user_url(&["messages", message_id, "attachments", attachment_id])?;
        let resp = self.send("get_attachment", self.client.get(url)).await?;
        let attachment: GraphAttachment = Self::read_json("get_attachment", resp).await?;

        let is_file = attachment
            .odata_type
            .as_deref()
            .is_none_or(|t| t == FILE_ATTACHMENT_TYPE);
        let content = match attachment.content_bytes {
            Some(content) if is_file => content,
            _ => {
                return Err(MailboxError::NotFileAttachment {
                    attachment_id: attachment_id.to_string(),
                });
            }
        };

        let bytes = base64::engine::general_purpose::STANDARD.decode(content.trim())?;
        Ok(FileAttachment {
            name: attachment.name.unwrap_or_default(),
            bytes,
        })
    }

    /// Fetch an attachment and extract its text through a scoped temp file.
    pub async fn attachment_text(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> crate::error::Result<String> {
        let file = self.fetch_attachment(message_id, attachment_id).await?;

        let Some(kind) = DocumentKind::from_name(&file.name) else {
            warn!(
                attachment = %file.name,
                "Unsupported attachment type for text extraction"
            );
            return Ok(String::new());
        };

        let temp = tempfile::Builder::new()
            .prefix("harvest-")
            .suffix(kind.extension())
            .tempfile_in(&self.config.scratch_dir)
            .map_err(MailboxError::from)?;

        tokio::fs::write(temp.path(), &file.bytes)
            .await
            .map_err(MailboxError::from)?;

        info!(
            attachment = %file.name,
            %kind,
            extractor = self.extractor.name(),
            "Extracting attachment text"
        );
        let extracted = self.extractor.extract(temp.path(), kind).await;

        if let Err(e) = temp.close() {
            warn!(error = %e, "Failed to remove temporary attachment file");
        }

        Ok(extracted?)
    }

    /// Fetch an attachment and write it to `destination`.
    pub async fn save_attachment(
        &self,
        message_id: &str,
        attachment_id: &str,
        destination: &Path,
    ) -> Result<(), MailboxError> {
        let file = self.fetch_attachment(message_id, attachment_id).await?;

        if let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(destination, &file.bytes).await?;

        info!(
            attachment = %file.name,
            path = %destination.display(),
            bytes = file.bytes.len(),
            "Attachment saved"
        );
        Ok(())
    }

    /// PATCH the message's read flag.
    pub async fn set_read(&self, message_id: &str) -> Result<(), MailboxError> {
        let url = self.user_url(&["messages", message_id])?;
        let body = serde_json::json!({ "isRead": true });
        self.send("mark_as_read", self.client.patch(url).json(&body))
            .await?;
        Ok(())
    }

    /// Move a message, resolving the destination folder name to an id.
    pub async fn move_to_folder(
        &self,
        message_id: &str,
        destination_folder: &str,
    ) -> Result<(), MailboxError> {
        let destination_id = self.resolve_folder_id(destination_folder).await?;
        let url = self.user_url(&["messages", message_id, "move"])?;
        let body = serde_json::json!({ "destinationId": destination_id });
        self.send("move_message", self.client.post(url).json(&body))
            .await?;
        Ok(())
    }

    /// Map a folder display name to something Graph accepts as a
    /// destination: well-known names pass through, anything else is looked
    /// up among top-level folders and created when missing.
    pub async fn resolve_folder_id(&self, name: &str) -> Result<String, MailboxError> {
        if WELL_KNOWN_FOLDERS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(name))
        {
            return Ok(name.to_string());
        }

        let key = name.to_lowercase();
        let mut cache = self.folder_ids.lock().await;
        if let Some(id) = cache.get(&key) {
            return Ok(id.clone());
        }

        let folders: Vec<GraphFolder> = self
            .get_all_pages("list_folders", self.user_url(&["mailFolders"])?)
            .await?;

        let id = match folders.into_iter().find(|f| {
            f.display_name
                .as_deref()
                .is_some_and(|d| d.eq_ignore_ascii_case(name))
        }) {
            Some(folder) => folder.id,
            None => self.create_folder(name).await?,
        };

        debug!(folder = name, id = %id, "Resolved destination folder");
        cache.insert(key, id.clone());
        Ok(id)
    }

    async fn create_folder(&self, name: &str) -> Result<String, MailboxError> {
        let url = self.user_url(&["mailFolders"])?;
        let body = serde_json::json!({ "displayName": name });
        let resp = self
            .send("create_folder", self.client.post(url).json(&body))
            .await?;
        let folder: GraphFolder = Self::read_json("create_folder", resp).await?;
        info!(folder = name, "Created mail folder");
        Ok(folder.id)
    }
}

#[async_trait]
impl Mailbox for GraphMailbox {
    async fn list_unread_with_attachments(&self) -> Vec<Message> {
        info!(mailbox = %self.config.mailbox, folder = %self.config.folder, "Fetching unread mail");
        match self.fetch_unread().await {
            Ok(messages) => {
                if messages.is_empty() {
                    info!("No new mail");
                } else {
                    info!(count = messages.len(), "Unread messages found");
                }
                messages
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch unread mail");
                Vec::new()
            }
        }
    }

    async fn get_attachment_text(&self, message_id: &str, attachment_id: &str) -> String {
        match self.attachment_text(message_id, attachment_id).await {
            Ok(text) => text,
            Err(e) => {
                error!(message_id, attachment_id, error = %e, "Failed to extract attachment text");
                String::new()
            }
        }
    }

    async fn download_attachment(&self, message_id: &str, attachment_id: &str, destination: &Path) {
        if let Err(e) = self
            .save_attachment(message_id, attachment_id, destination)
            .await
        {
            match e {
                MailboxError::NotFileAttachment { .. } => {
                    warn!(message_id, attachment_id, "Attachment has no file content; skipped")
                }
                other => {
                    error!(message_id, attachment_id, error = %other, "Failed to download attachment")
                }
            }
        }
    }

    async fn mark_as_read(&self, message_id: &str) {
        info!(message_id, "Marking message as read");
        if let Err(e) = self.set_read(message_id).await {
            error!(message_id, error = %e, "Failed to mark message as read");
        }
    }

    async fn move_message(&self, message_id: &str, destination_folder: &str) {
        info!(message_id, folder = destination_folder, "Moving message");
        if let Err(e) = self.move_to_folder(message_id, destination_folder).await {
            error!(message_id, folder = destination_folder, error = %e, "Failed to move message");
        }
    }
}
