mod app;
pub mod audio;
pub mod config;
pub mod detect;
pub mod link;
pub mod media;
pub mod session;
pub mod speech;
mod telemetry;

pub use app::logging::{init_logging, log_debug, log_debug_content, log_panic};
pub use session::{CallOrchestrator, SessionCommand, SessionSnapshot, SessionTuning};
pub use telemetry::init_tracing;
