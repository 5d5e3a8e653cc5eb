//! Engine Events
//!
//! Events flow from the engine (including the realtime callback) to the
//! display thread over a bounded channel. The realtime side only ever uses
//! `try_send`; a full channel drops the event.

use serde::{Deserialize, Serialize};

/// Events sent from the engine to the display thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// Realtime callback is running
    Activated,

    /// A probe's source could not be connected to its sink
    ConnectFailed {
        source: String,
        sink: String,
        message: String,
    },

    /// A processor failed and the period was aborted
    PeriodFailed { probe: String, message: String },

    /// Realtime callback stopped
    Deactivated,
}

impl Event {
    /// Whether this event means metering has stopped for good
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::PeriodFailed { .. })
    }
}
