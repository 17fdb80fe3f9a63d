//! Error types for the harvester.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Mailbox error: {0}")]
    Mailbox(#[from] MailboxError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Remote mail API errors.
///
/// `op` names the Graph operation that failed (`list_messages`,
/// `get_attachment`, ...) so log lines stay greppable.
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("Token request failed: {0}")]
    Auth(String),

    #[error("{op} request failed: {reason}")]
    Request { op: String, reason: String },

    #[error("{op} returned HTTP {status}: {body}")]
    Status {
        op: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {op}: {reason}")]
    InvalidResponse { op: String, reason: String },

    #[error("Attachment {attachment_id} is not a file attachment or has no content")]
    NotFileAttachment { attachment_id: String },

    #[error("Attachment content is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Document text extraction errors.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("PDF extraction error: {0}")]
    Pdf(String),

    #[error("DOCX extraction error: {0}")]
    Docx(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parser task failed or panicked inside `spawn_blocking`.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Result type alias for the harvester.
pub type Result<T> = std::result::Result<T, Error>;
