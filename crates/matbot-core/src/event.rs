//! Inbound events and outbound effects
//!
//! The transport turns platform updates into [`Inbound`] values and realizes
//! the [`Response`] it gets back through a [`MediaSink`].

use crate::delivery::{Delivery, DeliveryReport, MediaSink};
use matbot_catalog::TaskId;

/// Prefix of task selection payloads (`task_5`)
pub const SELECTION_PREFIX: &str = "task_";

/// Number of task buttons per menu row
pub const MENU_COLUMNS: usize = 5;

/// Event received from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// `/start`: show the task menu
    Start,
    /// A task was picked from the menu
    SelectTask(TaskId),
    /// `/add <task>` with the raw argument text
    Add(Option<String>),
    /// `/done`
    Done,
    /// `/list`
    List,
    /// `/checkme`
    CheckMe,
    /// A media item was sent
    Media {
        /// Platform media kind tag
        kind: String,
        /// Platform file id
        external_id: String,
    },
    /// Anything else
    Other,
}

impl Inbound {
    /// Parse a text message
    ///
    /// Commands may carry a `@botname` suffix. `/add` keeps everything after
    /// the command word as its argument, trimmed; validation happens later.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let text = text.trim();
        let Some(rest) = text.strip_prefix('/') else {
            return Self::Other;
        };

        let (word, arg) = match rest.split_once(char::is_whitespace) {
            Some((word, arg)) => (word, Some(arg.trim())),
            None => (rest, None),
        };
        let command = word.split_once('@').map_or(word, |(name, _)| name);

        match command {
            "start" => Self::Start,
            "add" => Self::Add(arg.filter(|a| !a.is_empty()).map(str::to_string)),
            "done" => Self::Done,
            "list" => Self::List,
            "checkme" => Self::CheckMe,
            _ => Self::Other,
        }
    }

    /// Parse a menu selection payload
    ///
    /// Payloads that do not name a valid task are unrecognized input.
    #[must_use]
    pub fn from_selection(data: &str) -> Self {
        data.strip_prefix(SELECTION_PREFIX)
            .and_then(|n| n.parse::<TaskId>().ok())
            .map_or(Self::Other, Self::SelectTask)
    }

    /// Media item event
    #[inline]
    #[must_use]
    pub fn media(kind: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self::Media {
            kind: kind.into(),
            external_id: external_id.into(),
        }
    }
}

/// One effect for the transport to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Text message
    Reply(String),
    /// Selectable task options
    TaskMenu {
        /// Prompt shown above the options
        prompt: String,
        /// Options in display order
        tasks: Vec<TaskId>,
        /// Options per row
        columns: usize,
    },
    /// Media items, followed by a warning if any fail
    Deliver(Delivery),
}

/// Ordered effects answering one inbound event
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    effects: Vec<Outbound>,
}

impl Response {
    /// Single text reply
    #[inline]
    #[must_use]
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            effects: vec![Outbound::Reply(text.into())],
        }
    }

    /// Single effect
    #[inline]
    #[must_use]
    pub fn single(effect: Outbound) -> Self {
        Self {
            effects: vec![effect],
        }
    }

    /// Effects in order
    #[inline]
    #[must_use]
    pub fn effects(&self) -> &[Outbound] {
        &self.effects
    }

    /// Text of the first reply, if any
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.effects.iter().find_map(|effect| match effect {
            Outbound::Reply(text) => Some(text.as_str()),
            _ => None,
        })
    }

    /// Perform every effect through `sink`
    ///
    /// Media deliveries tolerate per-item failures and end with one
    /// aggregated warning. Failed text sends are logged.
    pub async fn realize(&self, sink: &dyn MediaSink) -> Vec<DeliveryReport> {
        let mut reports = Vec::new();

        for effect in &self.effects {
            match effect {
                Outbound::Reply(text) => send_text_logged(sink, text).await,
                Outbound::TaskMenu {
                    prompt,
                    tasks,
                    columns,
                } => {
                    if let Err(e) = sink.send_menu(prompt, tasks, *columns).await {
                        tracing::warn!("Failed to send task menu: {}", e);
                    }
                }
                Outbound::Deliver(delivery) => {
                    let report = delivery.run(sink).await;
                    if let Some(warning) = report.warning() {
                        send_text_logged(sink, &warning).await;
                    }
                    reports.push(report);
                }
            }
        }

        reports
    }
}

async fn send_text_logged(sink: &dyn MediaSink, text: &str) {
    if let Err(e) = sink.send_text(text).await {
        tracing::warn!("Failed to send reply: {}", e);
    }
}
