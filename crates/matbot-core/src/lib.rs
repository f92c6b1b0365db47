//! matbot core - admin gate, upload sessions and dispatch
//!
//! Sits between a messaging transport and the task catalog:
//! - [`AdminGate`] decides who may upload and list
//! - [`SessionManager`] tracks which task each administrator is uploading to
//! - [`Dispatcher`] routes inbound events and builds the responses
//! - [`Delivery`] sends materials, isolating per-item failures
//!
//! # Example
//!
//! ```rust,ignore
//! use matbot_core::{BotConfig, Dispatcher, Inbound, UserId};
//!
//! # async fn example(sink: &dyn matbot_core::MediaSink) -> Result<(), Box<dyn std::error::Error>> {
//! let config = BotConfig::from_env()?;
//! let dispatcher = Dispatcher::from_config(&config);
//!
//! let response = dispatcher.handle(UserId(42), Inbound::from_text("/add 5"));
//! response.realize(sink).await;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod delivery;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod gate;
pub mod session;

pub use config::{BotConfig, ADMIN_IDS_VAR};
pub use delivery::{Delivery, DeliveryFailure, DeliveryReport, MediaSink};
pub use dispatch::{Dispatcher, Inventory, Materials, UNRECOGNIZED_REPLY};
pub use error::{ConfigError, DeliveryError, Rejection, SessionError};
pub use event::{Inbound, Outbound, Response};
pub use gate::{AdminGate, AdminSet, UserId};
pub use session::{SessionManager, SessionState};

pub use matbot_catalog::{CatalogStore, MediaKind, MediaReference, TaskId};

/// Common imports for transports
pub mod prelude {
    //! Common imports for working with matbot core
    pub use crate::{
        BotConfig, Dispatcher, Inbound, MediaReference, MediaSink, Outbound, Response, TaskId,
        UserId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
