//! Tick-by-tick orchestration from raw samples to position estimates

pub mod state;
pub mod session;

pub use session::PositioningSession;
pub use state::{SessionState, SessionStats, TickOutcome};
