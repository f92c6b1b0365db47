//! Per-administrator upload sessions
//!
//! Each identity is either idle or awaiting files for one task. Idle
//! sessions are not stored; the map only holds bound sessions.
//!
//! ```text
//! Idle ──begin(t)──▶ AwaitingFile(t) ──accept_file──▶ AwaitingFile(t)
//!   ▲                   │    │
//!   └──────finish───────┘    └──begin(t')──▶ AwaitingFile(t')
//! ```

use crate::error::SessionError;
use crate::gate::UserId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use matbot_catalog::TaskId;

/// Upload session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No upload in progress
    #[default]
    Idle,
    /// Files are attached to this task
    AwaitingFile(TaskId),
}

/// Events driving a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Start (or restart) an upload for a task
    Begin(TaskId),
    /// A file arrived
    AcceptFile,
    /// Leave upload mode
    Finish,
}

impl SessionEvent {
    fn name(self) -> &'static str {
        match self {
            Self::Begin(_) => "begin",
            Self::AcceptFile => "accept_file",
            Self::Finish => "finish",
        }
    }
}

/// Apply an event to a state
///
/// # Errors
/// `SessionError::IllegalTransition` when a file arrives while idle
pub fn transition(from: SessionState, event: SessionEvent) -> Result<SessionState, SessionError> {
    use SessionState::{AwaitingFile, Idle};
    match (from, event) {
        (_, SessionEvent::Begin(task)) => Ok(AwaitingFile(task)),
        (AwaitingFile(task), SessionEvent::AcceptFile) => Ok(AwaitingFile(task)),
        (_, SessionEvent::Finish) => Ok(Idle),
        (Idle, SessionEvent::AcceptFile) => Err(SessionError::IllegalTransition {
            from,
            event: event.name(),
        }),
    }
}

/// Session store keyed by administrator identity
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: DashMap<UserId, TaskId>,
}

impl SessionManager {
    /// Create empty manager
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state for an identity
    #[must_use]
    pub fn state(&self, user: UserId) -> SessionState {
        self.sessions
            .get(&user)
            .map_or(SessionState::Idle, |task| SessionState::AwaitingFile(*task))
    }

    /// Task the identity is uploading to, if any
    #[inline]
    #[must_use]
    pub fn active_task(&self, user: UserId) -> Option<TaskId> {
        self.sessions.get(&user).map(|task| *task)
    }

    /// Bind the identity to `task`, replacing any earlier binding
    ///
    /// Returns the previous binding.
    pub fn begin(&self, user: UserId, task: TaskId) -> Option<TaskId> {
        self.apply(user, SessionEvent::Begin(task))
            .ok()
            .and_then(|(before, _)| match before {
                SessionState::AwaitingFile(prev) => Some(prev),
                SessionState::Idle => None,
            })
    }

    /// Resolve the task an incoming file belongs to
    ///
    /// # Errors
    /// `SessionError::IllegalTransition` if the identity is idle
    pub fn accept_file(&self, user: UserId) -> Result<TaskId, SessionError> {
        match self.apply(user, SessionEvent::AcceptFile)? {
            (_, SessionState::AwaitingFile(task)) => Ok(task),
            (before, SessionState::Idle) => Err(SessionError::IllegalTransition {
                from: before,
                event: SessionEvent::AcceptFile.name(),
            }),
        }
    }

    /// Return the identity to idle
    ///
    /// Returns the task that was bound, if any.
    pub fn finish(&self, user: UserId) -> Option<TaskId> {
        self.sessions.remove(&user).map(|(_, task)| task)
    }

    /// Number of identities with an upload in progress
    #[inline]
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    fn apply(
        &self,
        user: UserId,
        event: SessionEvent,
    ) -> Result<(SessionState, SessionState), SessionError> {
        // read and write under the same shard lock
        match self.sessions.entry(user) {
            Entry::Occupied(mut slot) => {
                let before = SessionState::AwaitingFile(*slot.get());
                let after = transition(before, event)?;
                match after {
                    SessionState::AwaitingFile(task) => {
                        slot.insert(task);
                    }
                    SessionState::Idle => {
                        slot.remove();
                    }
                }
                Ok((before, after))
            }
            Entry::Vacant(slot) => {
                let after = transition(SessionState::Idle, event)?;
                if let SessionState::AwaitingFile(task) = after {
                    slot.insert(task);
                }
                Ok((SessionState::Idle, after))
            }
        }
    }
}
