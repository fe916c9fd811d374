//! HTTP status API for skilltag-pipeline
//!
//! Read-only: health, the latest run snapshot, and an SSE feed of
//! tagging events.

pub mod health;
pub mod progress;
pub mod sse;

pub use health::health_routes;
pub use progress::progress_routes;
pub use sse::event_stream;
