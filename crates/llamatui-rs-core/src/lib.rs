//! Console services that sit beside the supervisor: model discovery, the
//! daily launch schedule, GPU telemetry and host memory reporting.

pub mod host;
pub mod models;
pub mod schedule;
pub mod telemetry;

pub use host::{HostMemory, format_memory};
pub use models::{ModelFile, ModelRegistry, RegistryError, scan_models};
pub use schedule::{SCHEDULE_COOLDOWN, Scheduler};
pub use telemetry::{TELEMETRY_PROGRAM, TELEMETRY_TIMEOUT, TelemetryError, TelemetryProbe};
