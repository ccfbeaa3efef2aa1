pub mod engine;
pub mod error;
pub mod event;
pub mod state;

pub use engine::Monitor;
pub use error::MonitorError;
pub use event::{EventKind, NotificationEvent};
pub use state::{ErrorStateTracker, MonitorState, TransitionDecision};
