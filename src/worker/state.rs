//! Polling worker state machine.

use serde::{Deserialize, Serialize};

/// Where the polling loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Constructed, loop not started yet.
    Idle,
    /// Listing unread mail.
    FetchingMail,
    /// Starting on one message.
    ProcessingMessage,
    /// Extracting and scanning an attachment.
    MatchingAttachments,
    /// Saving a matched attachment.
    Downloading,
    /// Marking read and moving to the archive folder.
    Archiving,
    /// Waiting for the next cycle.
    Sleeping,
    /// Cancelled; the loop has exited.
    Stopped,
}

impl WorkerState {
    /// Check if this state allows transitioning to another state.
    ///
    /// Any active state may drop to `Sleeping`: an abandoned cycle goes
    /// straight to the inter-cycle wait.
    pub fn can_transition_to(&self, target: WorkerState) -> bool {
        use WorkerState::*;

        if self.is_active() && target == Sleeping {
            return true;
        }

        matches!(
            (self, target),
            (Idle, FetchingMail) | (Idle, Stopped) |
            (FetchingMail, ProcessingMessage) |
            (ProcessingMessage, MatchingAttachments) | (ProcessingMessage, Archiving) |
            (MatchingAttachments, MatchingAttachments) |
            (MatchingAttachments, Downloading) | (MatchingAttachments, Archiving) |
            (Downloading, Archiving) |
            (Archiving, ProcessingMessage) |
            (Sleeping, FetchingMail) | (Sleeping, Stopped)
        )
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Check if the loop is still running.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::FetchingMail => "fetching_mail",
            Self::ProcessingMessage => "processing_message",
            Self::MatchingAttachments => "matching_attachments",
            Self::Downloading => "downloading",
            Self::Archiving => "archiving",
            Self::Sleeping => "sleeping",
            Self::Stopped => "stopped",
        };
        write!(f, "{s}")
    }
}
