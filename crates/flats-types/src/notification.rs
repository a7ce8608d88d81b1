//! Messages pushed to WebSocket clients.
//!
//! Every message is a JSON object `{ "type", "data", "timestamp" }`. The
//! `type`/`data` pair comes from [`NotificationEvent`]; the timestamp is
//! stamped when the [`Notification`] is built.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dto::{FlatDto, HouseDto, ImportHistoryDto};
use crate::ids::{FlatId, HouseId, SessionId};

/// Payload of a notification, tagged by its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationEvent {
    /// Sent once when a client connects.
    #[serde(rename_all = "camelCase")]
    Connected {
        /// Greeting text.
        message: String,
        /// Identifier of the new session.
        session_id: SessionId,
    },
    /// Reply to a client `ping`.
    Pong {
        /// Always `pong`.
        message: String,
    },
    /// Reply to a message the server does not understand.
    Error {
        /// What went wrong.
        message: String,
    },
    /// A flat was created.
    FlatCreated(Box<FlatDto>),
    /// A flat was updated.
    FlatUpdated(Box<FlatDto>),
    /// A flat was deleted.
    FlatDeleted {
        /// Identifier of the deleted flat.
        id: FlatId,
    },
    /// A house was created.
    HouseCreated(HouseDto),
    /// A house was updated.
    HouseUpdated(HouseDto),
    /// A house was deleted.
    HouseDeleted {
        /// Identifier of the deleted house.
        id: HouseId,
    },
    /// A batch import was committed.
    ImportCompleted(ImportHistoryDto),
}

impl NotificationEvent {
    /// Greeting for a freshly connected session.
    pub fn connected(session_id: SessionId) -> Self {
        Self::Connected {
            message: String::from("Connected to notifications"),
            session_id,
        }
    }

    /// Reply to a client ping.
    pub fn pong() -> Self {
        Self::Pong {
            message: String::from("pong"),
        }
    }

    /// Error reply carrying `message`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// The wire name of this event's type.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "CONNECTED",
            Self::Pong { .. } => "PONG",
            Self::Error { .. } => "ERROR",
            Self::FlatCreated(_) => "FLAT_CREATED",
            Self::FlatUpdated(_) => "FLAT_UPDATED",
            Self::FlatDeleted { .. } => "FLAT_DELETED",
            Self::HouseCreated(_) => "HOUSE_CREATED",
            Self::HouseUpdated(_) => "HOUSE_UPDATED",
            Self::HouseDeleted { .. } => "HOUSE_DELETED",
            Self::ImportCompleted(_) => "IMPORT_COMPLETED",
        }
    }
}

/// A timestamped message ready to be serialized and sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Type and payload.
    #[serde(flatten)]
    pub event: NotificationEvent,
    /// When the notification was built.
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// Stamp `event` with the current time.
    pub fn now(event: NotificationEvent) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
        }
    }

    /// Serialize to the JSON text sent over the socket.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<NotificationEvent> for Notification {
    fn from(event: NotificationEvent) -> Self {
        Self::now(event)
    }
}
