//! Request dispatch
//!
//! [`Dispatcher`] is the single entry point for the transport. It owns the
//! catalog store, the upload sessions and the admin gate, and turns each
//! inbound event into a [`Response`].
//!
//! Session transitions and catalog appends go through one mutation lock so
//! that "read session, append, persist" is never interleaved. Material
//! lookups only need the catalog's read lock, and no lock is held while
//! media is being sent.

use crate::config::BotConfig;
use crate::delivery::Delivery;
use crate::error::Rejection;
use crate::event::{Inbound, Outbound, Response, MENU_COLUMNS};
use crate::gate::{AdminGate, AdminSet, UserId};
use crate::session::SessionManager;
use matbot_catalog::{CatalogStore, MediaKind, MediaReference, TaskId, ValidationError};
use parking_lot::Mutex;
use std::fmt;

/// Reply to unrecognized input
pub const UNRECOGNIZED_REPLY: &str = "Use /start to choose a task.";

/// Prompt above the task menu
pub const MENU_PROMPT: &str = "Choose a task number (1 to 19):";

/// Result of looking up a task's materials
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Materials {
    /// Nothing uploaded for this task yet
    Empty(TaskId),
    /// Items to send, in display order
    Ready(Delivery),
}

/// Catalog coverage for administrators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inventory {
    /// `(task, count)` of every populated task, ascending
    pub tasks: Vec<(TaskId, usize)>,
}

impl fmt::Display for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tasks.is_empty() {
            return f.write_str("No materials uploaded yet.");
        }
        f.write_str("Tasks with materials:")?;
        for (task, count) in &self.tasks {
            write!(f, "\nTask {task}: {count} file(s)")?;
        }
        Ok(())
    }
}

/// Catalog, sessions and admin gate behind one facade
#[derive(Debug)]
pub struct Dispatcher {
    store: CatalogStore,
    sessions: SessionManager,
    gate: AdminGate,
    mutation: Mutex<()>,
}

impl Dispatcher {
    /// Create dispatcher over an opened store
    #[must_use]
    pub fn new(store: CatalogStore, admins: AdminSet) -> Self {
        Self {
            store,
            sessions: SessionManager::new(),
            gate: AdminGate::new(admins),
            mutation: Mutex::new(()),
        }
    }

    /// Open the configured store and build a dispatcher
    #[must_use]
    pub fn from_config(config: &BotConfig) -> Self {
        tracing::info!(
            "Starting with {} administrator(s), catalog at {}",
            config.admins.len(),
            config.data_file.display()
        );
        Self::new(
            CatalogStore::open(config.data_file.clone()),
            config.admins.clone(),
        )
    }

    /// Underlying catalog store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    /// Upload sessions
    #[inline]
    #[must_use]
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Check whether `who` is an administrator
    #[inline]
    #[must_use]
    pub fn is_admin(&self, who: UserId) -> bool {
        self.gate.is_admin(who)
    }

    /// Materials to send for a task
    #[must_use]
    pub fn request_materials(&self, task: TaskId) -> Materials {
        let items = self.store.get(task);
        if items.is_empty() {
            Materials::Empty(task)
        } else {
            Materials::Ready(Delivery::new(task, items))
        }
    }

    /// Start an upload session for `who` on the task named by `arg`
    ///
    /// On rejection any existing session is left untouched.
    ///
    /// # Errors
    /// - `Rejection::Forbidden` if `who` is not an administrator
    /// - `Rejection::Validation` if `arg` is missing, non-numeric or out of range
    pub fn begin_upload(&self, who: UserId, arg: Option<&str>) -> Result<TaskId, Rejection> {
        self.require_admin(who, "add")?;
        let task = arg
            .ok_or_else(|| ValidationError::MalformedTask(String::new()))?
            .parse::<TaskId>()?;

        let _guard = self.mutation.lock();
        match self.sessions.begin(who, task) {
            Some(previous) => {
                tracing::info!("Admin {} rebound upload from task {} to {}", who, previous, task);
            }
            None => tracing::info!("Admin {} started upload for task {}", who, task),
        }
        Ok(task)
    }

    /// Attach a media item to the session's task
    ///
    /// # Errors
    /// - `Rejection::NoActiveSession` if `who` has no upload in progress
    /// - `Rejection::Validation` if the kind is unknown or the id is empty
    /// - `Rejection::Storage` if the catalog could not be persisted
    pub fn accept_upload(
        &self,
        who: UserId,
        kind: &str,
        external_id: &str,
    ) -> Result<TaskId, Rejection> {
        let _guard = self.mutation.lock();
        self.attach(who, kind, external_id)
    }

    /// Session check, validation and append; caller holds the mutation lock
    fn attach(&self, who: UserId, kind: &str, external_id: &str) -> Result<TaskId, Rejection> {
        let task = self
            .sessions
            .accept_file(who)
            .map_err(|_| Rejection::NoActiveSession)?;

        let kind = kind.parse::<MediaKind>()?;
        if external_id.is_empty() {
            return Err(ValidationError::MissingExternalId.into());
        }

        self.store
            .append(task, MediaReference::new(kind, external_id))?;
        tracing::info!("Admin {} added {} to task {}", who, kind, task);
        Ok(task)
    }

    /// Leave upload mode; succeeds whether or not a session was active
    pub fn finish_upload(&self, who: UserId) {
        let _guard = self.mutation.lock();
        if let Some(task) = self.sessions.finish(who) {
            tracing::info!("Admin {} finished upload for task {}", who, task);
        }
    }

    /// Catalog coverage report
    ///
    /// # Errors
    /// `Rejection::Forbidden` if `who` is not an administrator
    pub fn inventory(&self, who: UserId) -> Result<Inventory, Rejection> {
        self.require_admin(who, "list")?;
        Ok(Inventory {
            tasks: self.store.list_non_empty(),
        })
    }

    /// Route one inbound event
    #[must_use]
    pub fn handle(&self, who: UserId, event: Inbound) -> Response {
        tracing::debug!("Event from {}: {:?}", who, event);

        match event {
            Inbound::Start => Response::single(Outbound::TaskMenu {
                prompt: MENU_PROMPT.to_string(),
                tasks: TaskId::all().collect(),
                columns: MENU_COLUMNS,
            }),
            Inbound::SelectTask(task) => match self.request_materials(task) {
                Materials::Empty(task) => {
                    Response::reply(format!("No materials for task {task} yet."))
                }
                Materials::Ready(delivery) => Response::single(Outbound::Deliver(delivery)),
            },
            Inbound::Add(arg) => match self.begin_upload(who, arg.as_deref()) {
                Ok(task) => Response::reply(format!(
                    "Send a file (PDF, video or audio) for task {task}.\n\
                     You can send several files for the same task.\n\
                     Send /done when finished."
                )),
                Err(rejection) => Response::reply(rejection.to_string()),
            },
            Inbound::Done => {
                self.finish_upload(who);
                Response::reply("Upload mode finished.")
            }
            Inbound::List => match self.inventory(who) {
                Ok(inventory) => Response::reply(inventory.to_string()),
                Err(rejection) => Response::reply(rejection.to_string()),
            },
            Inbound::CheckMe => Response::reply(if self.is_admin(who) {
                "You are an administrator."
            } else {
                "You are not an administrator."
            }),
            Inbound::Media { kind, external_id } => {
                let _guard = self.mutation.lock();
                match self.attach(who, &kind, &external_id) {
                    Ok(task) => Response::reply(format!(
                        "File added to task {task}. Send another file or /done to finish."
                    )),
                    // media outside an upload is ordinary chatter
                    Err(Rejection::NoActiveSession) => Response::reply(UNRECOGNIZED_REPLY),
                    Err(rejection) => Response::reply(rejection.to_string()),
                }
            }
            Inbound::Other => Response::reply(UNRECOGNIZED_REPLY),
        }
    }

    fn require_admin(&self, who: UserId, operation: &str) -> Result<(), Rejection> {
        if self.gate.is_admin(who) {
            Ok(())
        } else {
            tracing::warn!("Rejected {} from non-admin {}", operation, who);
            Err(Rejection::Forbidden)
        }
    }
}
