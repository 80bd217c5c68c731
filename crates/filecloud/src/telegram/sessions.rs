//! Per-user conversation state
//!
//! A user is in at most one mode at a time: single upload, bulk upload or
//! (admins only) editing the branding caption. Starting a new mode replaces
//! the previous one. State lives in memory and is lost on restart.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::telegram::media::IncomingFile;

/// A file received during a bulk session, not yet stored.
#[derive(Debug, Clone)]
pub struct PendingFile {
    pub file: IncomingFile,
    /// Message in the user's chat, copied to the storage channel on commit
    pub chat_id: i64,
    pub message_id: i32,
}

#[derive(Debug, Clone)]
pub struct BulkSession {
    pub session_id: String,
    pub group_name: String,
    pub files: Vec<PendingFile>,
    pub started_at: DateTime<Utc>,
}

impl BulkSession {
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|p| p.file.size).sum()
    }
}

#[derive(Debug, Clone)]
pub enum UserSession {
    SingleUpload { group_name: String },
    BulkUpload(BulkSession),
    CaptionEdit,
}

/// Concurrent map of user id to their current mode.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<i64, UserSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: i64) -> Option<UserSession> {
        self.sessions.get(&user_id).map(|entry| entry.value().clone())
    }

    pub fn start_single(&self, user_id: i64, group_name: &str) {
        self.sessions.insert(
            user_id,
            UserSession::SingleUpload {
                group_name: group_name.to_string(),
            },
        );
    }

    pub fn start_bulk(&self, user_id: i64, session_id: &str, group_name: &str) {
        self.sessions.insert(
            user_id,
            UserSession::BulkUpload(BulkSession {
                session_id: session_id.to_string(),
                group_name: group_name.to_string(),
                files: Vec::new(),
                started_at: Utc::now(),
            }),
        );
    }

    pub fn start_caption_edit(&self, user_id: i64) {
        self.sessions.insert(user_id, UserSession::CaptionEdit);
    }

    /// Queues a file in the user's bulk session. Returns the new queue length,
    /// or `None` when the user has no bulk session.
    pub fn push_bulk_file(&self, user_id: i64, pending: PendingFile) -> Option<usize> {
        let mut entry = self.sessions.get_mut(&user_id)?;
        match entry.value_mut() {
            UserSession::BulkUpload(session) => {
                session.files.push(pending);
                Some(session.files.len())
            }
            _ => None,
        }
    }

    /// Removes and returns the user's bulk session.
    pub fn take_bulk(&self, user_id: i64) -> Option<BulkSession> {
        let (_, session) = self
            .sessions
            .remove_if(&user_id, |_, s| matches!(s, UserSession::BulkUpload(_)))?;
        match session {
            UserSession::BulkUpload(bulk) => Some(bulk),
            _ => None,
        }
    }

    /// Leaves single upload mode. Returns `true` if the user was in it.
    pub fn end_single(&self, user_id: i64) -> bool {
        self.sessions
            .remove_if(&user_id, |_, s| matches!(s, UserSession::SingleUpload { .. }))
            .is_some()
    }

    /// Leaves caption edit mode. Returns `true` if the user was in it.
    pub fn end_caption_edit(&self, user_id: i64) -> bool {
        self.sessions
            .remove_if(&user_id, |_, s| matches!(s, UserSession::CaptionEdit))
            .is_some()
    }

    pub fn clear(&self, user_id: i64) {
        self.sessions.remove(&user_id);
    }
}
