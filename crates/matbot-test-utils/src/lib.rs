//! Testing utilities for matbot workspace
//!
//! Shared fixtures: temporary catalogs, dispatchers and a recording sink.

#![allow(missing_docs)]

use async_trait::async_trait;
use matbot_catalog::{CatalogStore, MediaReference, TaskId};
use matbot_core::{AdminSet, DeliveryError, Dispatcher, MediaSink, UserId};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::PathBuf;
use tempfile::TempDir;

pub const ADMIN: UserId = UserId(1001);
pub const OTHER_ADMIN: UserId = UserId(1002);
pub const STUDENT: UserId = UserId(2001);

/// Dispatcher over a catalog file in its own temporary directory
pub struct TestBot {
    pub dir: TempDir,
    pub dispatcher: Dispatcher,
}

impl TestBot {
    pub fn data_file(&self) -> PathBuf {
        self.dir.path().join("materials.json")
    }

    /// Simulate a process restart with a (possibly different) admin list
    pub fn restart(self, admins: &[UserId]) -> Self {
        let store = CatalogStore::open(self.data_file());
        let dispatcher = Dispatcher::new(store, admins.iter().copied().collect());
        Self {
            dir: self.dir,
            dispatcher,
        }
    }
}

pub fn setup_test_bot() -> TestBot {
    setup_test_bot_with_admins(&[ADMIN, OTHER_ADMIN])
}

pub fn setup_test_bot_with_admins(admins: &[UserId]) -> TestBot {
    let dir = tempfile::tempdir().unwrap();
    let store = CatalogStore::open(dir.path().join("materials.json"));
    let admins: AdminSet = admins.iter().copied().collect();
    TestBot {
        dir,
        dispatcher: Dispatcher::new(store, admins),
    }
}

pub fn task(n: u64) -> TaskId {
    TaskId::new(n).unwrap()
}

/// Something the recording sink was asked to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Media(MediaReference),
    Text(String),
    Menu { prompt: String, tasks: Vec<TaskId> },
}

/// Sink that records every send and fails for chosen file ids
#[derive(Debug, Default)]
pub struct RecordingSink {
    failing: HashSet<String>,
    attempts: Mutex<Vec<Sent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|id| (*id).to_string()).collect(),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Every send attempt, successful or not
    pub fn attempts(&self) -> Vec<Sent> {
        self.attempts.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.attempts()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Text(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn media(&self) -> Vec<MediaReference> {
        self.attempts()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Media(item) => Some(item),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl MediaSink for RecordingSink {
    async fn send_media(&self, item: &MediaReference) -> Result<(), DeliveryError> {
        self.attempts.lock().push(Sent::Media(item.clone()));
        if self.failing.contains(item.external_id()) {
            return Err(DeliveryError::new(format!("rejected {}", item.external_id())));
        }
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<(), DeliveryError> {
        self.attempts.lock().push(Sent::Text(text.to_string()));
        Ok(())
    }

    async fn send_menu(
        &self,
        prompt: &str,
        tasks: &[TaskId],
        _columns: usize,
    ) -> Result<(), DeliveryError> {
        self.attempts.lock().push(Sent::Menu {
            prompt: prompt.to_string(),
            tasks: tasks.to_vec(),
        });
        Ok(())
    }
}
