pub mod control_store;
pub mod event_hub;
pub mod log_sink;
pub mod rate_limiter;
pub mod run_workspace;

pub use control_store::{
    apply_control_action, read_state, FileControlStore, MemoryControlStore, RunControlStore,
    StopSignal,
};
pub use event_hub::{EventHub, RunEvent};
pub use log_sink::{RunLog, RunLogWriter};
pub use rate_limiter::RateLimiter;
pub use run_workspace::{RunMetadata, RunWorkspace};
