//! Host-facing interfaces
//!
//! Callback-based delivery of position updates, a worker thread that owns the
//! session, and output formatting.

pub mod callback;
pub mod formatting;
pub mod types;
pub mod worker;

pub use callback::{CallbackHandle, CallbackPositioningApi, EventCallback, PositionCallback};
pub use formatting::{CsvFormatter, JsonFormatter, TextFormatter, UpdateFormatter};
pub use types::{ApiError, ApiResult, OutputFormat, PositionUpdate, SessionEvent};
pub use worker::{BundleSubmitter, SessionWorker};
