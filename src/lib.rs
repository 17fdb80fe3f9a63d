//! Inbox Harvester — polls a mailbox, keeps the attachments that mention
//! what you are looking for.

pub mod config;
pub mod error;
pub mod extract;
pub mod mailbox;
pub mod worker;
