//! Mailbox polling loop.
//!
//! One cycle:
//! 1. List unread messages with attachments
//! 2. Per message, scan supported attachments until one matches a keyword
//! 3. Download the first matching attachment (at most one per message)
//! 4. Mark the message read and move it to the archive folder, match or not
//!
//! Cycles are separated by a fixed sleep. Cancellation is checked before a
//! cycle starts and interrupts the sleep, never a cycle in flight.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::extract::DocumentKind;
use crate::mailbox::{Attachment, Mailbox, Message};
use crate::worker::matcher::{KeywordMatch, KeywordMatcher};
use crate::worker::state::WorkerState;

/// Settings for the polling worker.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Matched attachments are saved here under their own file name.
    pub download_dir: PathBuf,
    /// Keywords in priority order.
    pub keywords: Vec<String>,
    /// Folder inspected messages are moved to.
    pub archive_folder: String,
    /// Sleep between cycles.
    pub poll_interval: Duration,
}

/// A download triggered during a cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadRecord {
    pub message_id: String,
    pub attachment_name: String,
    pub keyword: String,
    pub destination: PathBuf,
}

/// Summary of one cycle, for logging and tests.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub messages_inspected: usize,
    pub downloads: Vec<DownloadRecord>,
    pub archived: usize,
}

impl CycleReport {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            messages_inspected: 0,
            downloads: Vec::new(),
            archived: 0,
        }
    }
}

/// The polling worker.
pub struct Poller {
    mailbox: Arc<dyn Mailbox>,
    matcher: KeywordMatcher,
    config: PollerConfig,
    state: watch::Sender<WorkerState>,
}

impl Poller {
    pub fn new(mailbox: Arc<dyn Mailbox>, config: PollerConfig) -> Self {
        let matcher = KeywordMatcher::new(config.keywords.iter().cloned());
        if matcher.is_empty() {
            warn!("No match keywords configured; attachments will never be downloaded");
        } else {
            debug!(count = matcher.len(), "Keyword matcher ready");
        }
        let (state, _) = watch::channel(WorkerState::Idle);
        Self {
            mailbox,
            matcher,
            config,
            state,
        }
    }

    /// Current loop state.
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: WorkerState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            if !prev.can_transition_to(next) {
                warn!(from = %prev, to = %next, "Unexpected worker state transition");
            }
            debug!(from = %prev, to = %next, "Worker state");
        }
    }

    /// Run cycles until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            interval_secs = self.config.poll_interval.as_secs(),
            keywords = ?self.matcher.keywords().collect::<Vec<_>>(),
            archive_folder = %self.config.archive_folder,
            started_at = %Utc::now(),
            "Harvester started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let cycle = AssertUnwindSafe(self.run_cycle()).catch_unwind().await;
            if let Err(panic) = cycle {
                error!(
                    panic = %panic_message(panic.as_ref()),
                    "Unexpected failure in harvest cycle; abandoning it"
                );
            }

            self.set_state(WorkerState::Sleeping);
            info!(
                interval_secs = self.config.poll_interval.as_secs(),
                "Cycle finished; waiting for the next one"
            );

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        self.set_state(WorkerState::Stopped);
        info!("Harvester stopped");
    }

    /// Run a single fetch → inspect → act pass.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::new();
        self.set_state(WorkerState::FetchingMail);
        info!("Starting mail check cycle");

        let messages = self.mailbox.list_unread_with_attachments().await;
        for message in &messages {
            self.process_message(message, &mut report).await;
        }

        info!(
            inspected = report.messages_inspected,
            downloads = report.downloads.len(),
            archived = report.archived,
            "Mail check cycle complete"
        );
        report
    }

    async fn process_message(&self, message: &Message, report: &mut CycleReport) {
        self.set_state(WorkerState::ProcessingMessage);
        info!(message_id = %message.id, subject = %message.subject, "Processing message");
        report.messages_inspected += 1;

        if let Some((attachment, hit)) = self.find_match(message).await {
            self.set_state(WorkerState::Downloading);
            let destination = self.destination_for(attachment);
            self.mailbox
                .download_attachment(&message.id, &attachment.id, &destination)
                .await;
            report.downloads.push(DownloadRecord {
                message_id: message.id.clone(),
                attachment_name: attachment.name.clone(),
                keyword: hit.keyword,
                destination,
            });
        }

        self.set_state(WorkerState::Archiving);
        info!(
            message_id = %message.id,
            folder = %self.config.archive_folder,
            "Message inspected; archiving"
        );
        self.mailbox.mark_as_read(&message.id).await;
        self.mailbox
            .move_message(&message.id, &self.config.archive_folder)
            .await;
        report.archived += 1;
    }

    /// First attachment whose text contains a keyword. Stops at the first hit.
    async fn find_match<'m>(&self, message: &'m Message) -> Option<(&'m Attachment, KeywordMatch)> {
        for attachment in &message.attachments {
            self.set_state(WorkerState::MatchingAttachments);

            if DocumentKind::from_name(&attachment.name).is_none() {
                debug!(attachment = %attachment.name, "Skipping non-document attachment");
                continue;
            }

            let text = self
                .mailbox
                .get_attachment_text(&message.id, &attachment.id)
                .await;
            if text.trim().is_empty() {
                debug!(attachment = %attachment.name, "No text extracted; skipping");
                continue;
            }

            if let Some(hit) = self.matcher.find(&text) {
                info!(
                    keyword = %hit.keyword,
                    priority = hit.position,
                    attachment = %attachment.name,
                    message_id = %message.id,
                    "Keyword match"
                );
                return Some((attachment, hit));
            }
        }
        None
    }

    /// Download path for an attachment: the download directory joined with
    /// the final component of the attachment name.
    pub fn destination_for(&self, attachment: &Attachment) -> PathBuf {
        let file_name = Path::new(&attachment.name)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| attachment.id.replace(['/', '\\'], "_").into());
        self.config.download_dir.join(file_name)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Spawn the polling loop on a background task.
///
/// Returns the task handle and a token that stops the loop when cancelled.
pub fn spawn_harvester(poller: Arc<Poller>) -> (JoinHandle<()>, CancellationToken) {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let handle = tokio::spawn(async move { poller.run(token).await });
    (handle, cancel)
}
