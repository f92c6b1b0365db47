//! Media delivery with per-item failure isolation
//!
//! The transport implements [`MediaSink`] for one requester. A [`Delivery`]
//! tries every item in order regardless of earlier failures and reports all
//! failures together in a [`DeliveryReport`].

use crate::error::DeliveryError;
use async_trait::async_trait;
use matbot_catalog::{MediaReference, TaskId};

/// Outbound channel to a single requester
#[async_trait]
pub trait MediaSink: Send + Sync {
    /// Send one media item
    async fn send_media(&self, item: &MediaReference) -> Result<(), DeliveryError>;

    /// Send a text message
    async fn send_text(&self, text: &str) -> Result<(), DeliveryError>;

    /// Present selectable tasks
    ///
    /// Transports without selectable options fall back to the prompt text.
    async fn send_menu(
        &self,
        prompt: &str,
        _tasks: &[TaskId],
        _columns: usize,
    ) -> Result<(), DeliveryError> {
        self.send_text(prompt).await
    }
}

/// Ordered media items to send for one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    task: TaskId,
    items: Vec<MediaReference>,
}

impl Delivery {
    /// Create delivery
    #[inline]
    #[must_use]
    pub fn new(task: TaskId, items: Vec<MediaReference>) -> Self {
        Self { task, items }
    }

    /// Task the items belong to
    #[inline]
    #[must_use]
    pub fn task(&self) -> TaskId {
        self.task
    }

    /// Items in send order
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[MediaReference] {
        &self.items
    }

    /// Send every item, collecting failures
    pub async fn run(&self, sink: &dyn MediaSink) -> DeliveryReport {
        let mut failures = Vec::new();

        for (index, item) in self.items.iter().enumerate() {
            if let Err(e) = sink.send_media(item).await {
                tracing::error!("Failed to send {} for task {}: {}", item, self.task, e);
                failures.push(DeliveryFailure {
                    index,
                    reference: item.clone(),
                    error: e,
                });
            }
        }

        DeliveryReport {
            task: self.task,
            attempted: self.items.len(),
            failures,
        }
    }
}

/// One item that could not be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    /// Position in the delivery
    pub index: usize,
    /// The item
    pub reference: MediaReference,
    /// Transport error
    pub error: DeliveryError,
}

/// Result of running a [`Delivery`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Task delivered
    pub task: TaskId,
    /// Number of send attempts
    pub attempted: usize,
    /// Items that failed
    pub failures: Vec<DeliveryFailure>,
}

impl DeliveryReport {
    /// Items that arrived
    #[inline]
    #[must_use]
    pub fn delivered(&self) -> usize {
        self.attempted - self.failures.len()
    }

    /// True if nothing failed
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Single aggregated warning for the requester, if anything failed
    #[must_use]
    pub fn warning(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        Some(format!(
            "Could not send {} of {} files for task {}.",
            self.failures.len(),
            self.attempted,
            self.task
        ))
    }
}
