//! Topic-based event bus for presentation events.
//!
//! The session worker publishes everything a kiosk screen needs to redraw:
//! session transitions, card changes and countdown ticks. Consumers
//! subscribe only to the topics they render.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::{BoardEvent, SessionEvent, TimerEvent};
