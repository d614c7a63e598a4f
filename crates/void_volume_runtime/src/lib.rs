//! Void Volume Runtime
//!
//! Headless host for the trigger engine: loads configuration and the volume
//! store, keeps a simulated world of online entities, and replays trace
//! scripts or interactive commands against them.

pub mod config;
pub mod metrics;
pub mod session;
pub mod trace;
pub mod world;

pub use config::{ConfigError, RuntimeConfig};
pub use metrics::{TransitionMetrics, VolumeCounts};
pub use session::Session;
pub use trace::{parse_line, parse_script, Command, TraceError};
pub use world::{PermissionTable, SimWorld};
