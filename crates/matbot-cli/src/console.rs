//! Line-oriented console transport
//!
//! Each stdin line is one JSON event:
//!
//! ```text
//! {"from": 42, "text": "/add 5"}
//! {"from": 42, "select": "task_5"}
//! {"from": 42, "media": {"kind": "video", "id": "BAACAgIAAxk"}}
//! ```
//!
//! Every outbound effect is written to stdout as one JSON line addressed to
//! the sender.

use async_trait::async_trait;
use matbot_core::{DeliveryError, Inbound, MediaReference, MediaSink, TaskId, UserId};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Media payload of a console event
#[derive(Debug, Deserialize)]
struct ConsoleMedia {
    kind: String,
    #[serde(default)]
    id: String,
}

/// Raw console event
#[derive(Debug, Deserialize)]
struct ConsoleEvent {
    from: UserId,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    select: Option<String>,
    #[serde(default)]
    media: Option<ConsoleMedia>,
}

/// Parse one input line into sender and event
///
/// # Errors
/// Returns error if the line is not a console event
pub(crate) fn parse_line(line: &str) -> Result<(UserId, Inbound), serde_json::Error> {
    let event: ConsoleEvent = serde_json::from_str(line)?;
    let inbound = if let Some(media) = event.media {
        Inbound::media(media.kind, media.id)
    } else if let Some(data) = event.select {
        Inbound::from_selection(&data)
    } else if let Some(text) = event.text {
        Inbound::from_text(&text)
    } else {
        Inbound::Other
    };
    Ok((event.from, inbound))
}

/// Sink writing JSON lines for one recipient
pub(crate) struct ConsoleSink<W> {
    to: UserId,
    out: Arc<Mutex<W>>,
}

impl<W> ConsoleSink<W> {
    pub(crate) fn new(to: UserId, out: Arc<Mutex<W>>) -> Self {
        Self { to, out }
    }
}

impl<W: AsyncWrite + Unpin + Send + 'static> ConsoleSink<W> {
    async fn emit(&self, value: serde_json::Value) -> Result<(), DeliveryError> {
        let mut line = value.to_string();
        line.push('\n');
        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes())
            .await
            .map_err(|e| DeliveryError::new(e.to_string()))?;
        out.flush()
            .await
            .map_err(|e| DeliveryError::new(e.to_string()))
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send + 'static> MediaSink for ConsoleSink<W> {
    async fn send_media(&self, item: &MediaReference) -> Result<(), DeliveryError> {
        self.emit(json!({ "to": self.to, "media": item })).await
    }

    async fn send_text(&self, text: &str) -> Result<(), DeliveryError> {
        self.emit(json!({ "to": self.to, "text": text })).await
    }

    async fn send_menu(
        &self,
        prompt: &str,
        tasks: &[TaskId],
        columns: usize,
    ) -> Result<(), DeliveryError> {
        let rows: Vec<Vec<String>> = tasks
            .chunks(columns.max(1))
            .map(|row| row.iter().map(|t| format!("task_{t}")).collect())
            .collect();
        self.emit(json!({ "to": self.to, "text": prompt, "options": rows }))
            .await
    }
}
