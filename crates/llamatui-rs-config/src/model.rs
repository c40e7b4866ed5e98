//! Settings schema for the console.

use crate::ValidationError;
use chrono::{NaiveTime, Timelike};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Smallest accepted context window.
pub const MIN_CONTEXT_SIZE: u32 = 512;
/// Context window used on first run.
pub const DEFAULT_CONTEXT_SIZE: u32 = 4096;
/// Smallest accepted CPU thread count.
pub const MIN_THREADS: u32 = 1;
/// Port used on first run.
pub const DEFAULT_PORT: u16 = 8080;
/// LAN address used on first run.
pub const DEFAULT_HOST_IP: &str = "0.0.0.0";
/// Address the server binds to when LAN access is disabled.
pub const LOOPBACK_HOST: &str = "127.0.0.1";
/// Value offered when the operator enables the schedule.
pub const DEFAULT_SCHEDULE_TIME: &str = "08:00";

const SCHEDULE_FORMAT: &str = "%H:%M";

/// Compute backend the server binary was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Backend {
    /// CPU only; GPU offload flags are never emitted.
    #[default]
    Cpu,
    /// NVIDIA CUDA build.
    Cuda,
    /// Vulkan build.
    Vulkan,
}

impl Backend {
    /// Next backend in the CPU -> CUDA -> VULKAN -> CPU cycle.
    pub fn next(self) -> Self {
        match self {
            Backend::Cpu => Backend::Cuda,
            Backend::Cuda => Backend::Vulkan,
            Backend::Vulkan => Backend::Cpu,
        }
    }

    /// Whether layers can be offloaded to a GPU with this backend.
    pub fn offloads_to_gpu(self) -> bool {
        matches!(self, Backend::Cuda | Backend::Vulkan)
    }

    /// Upper-case label used in the settings panel and on disk.
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Cpu => "CPU",
            Backend::Cuda => "CUDA",
            Backend::Vulkan => "VULKAN",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated time of day with minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleTime(NaiveTime);

impl ScheduleTime {
    /// Parse an `HH:MM` string.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        NaiveTime::parse_from_str(input.trim(), SCHEDULE_FORMAT)
            .map(Self)
            .map_err(|_| ValidationError::InvalidTime)
    }

    /// Build from a wall-clock time, dropping seconds.
    pub fn from_time(time: NaiveTime) -> Self {
        Self(NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time))
    }

    /// Canonical zero-padded `HH:MM` form.
    pub fn to_hhmm(self) -> String {
        self.0.format(SCHEDULE_FORMAT).to_string()
    }
}

impl fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hhmm())
    }
}

/// Full settings record persisted between sessions.
///
/// Missing keys fall back to [`Config::default`] so older and newer settings
/// files stay loadable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory scanned for model files.
    pub model_dir: PathBuf,
    /// Backend the server binary was built for.
    pub backend: Backend,
    /// Address used when LAN access is enabled.
    pub host_ip: String,
    /// Listen port.
    pub port: u16,
    /// Bind to `host_ip` instead of loopback.
    pub allow_lan: bool,
    /// Layers offloaded to the GPU; 0 disables offload.
    pub gpu_layers: u32,
    /// CPU threads passed with `-t`.
    pub threads: u32,
    /// Context window passed with `-c`.
    pub context_size: u32,
    /// Directory holding the server binary.
    pub server_dir: PathBuf,
    /// Daily launch time as `HH:MM`, empty when never set.
    pub schedule_time: String,
    /// Whether the daily launch is armed.
    pub schedule_active: bool,
}

impl Default for Config {
    fn default() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            model_dir: cwd.clone(),
            backend: Backend::Cpu,
            host_ip: DEFAULT_HOST_IP.to_string(),
            port: DEFAULT_PORT,
            allow_lan: false,
            gpu_layers: 0,
            threads: default_thread_count(),
            context_size: DEFAULT_CONTEXT_SIZE,
            server_dir: cwd,
            schedule_time: String::new(),
            schedule_active: false,
        }
    }
}

impl Config {
    /// Address the server should bind to.
    pub fn listen_host(&self) -> &str {
        if self.allow_lan {
            &self.host_ip
        } else {
            LOOPBACK_HOST
        }
    }

    /// Parsed schedule time, if one is stored and valid.
    pub fn schedule(&self) -> Option<ScheduleTime> {
        ScheduleTime::parse(&self.schedule_time).ok()
    }

    /// Arm the daily launch at `input`.
    ///
    /// On error the schedule is left exactly as it was.
    pub fn enable_schedule(&mut self, input: &str) -> Result<ScheduleTime, ValidationError> {
        let time = ScheduleTime::parse(input)?;
        self.schedule_time = time.to_hhmm();
        self.schedule_active = true;
        Ok(time)
    }

    /// Disarm the daily launch, keeping the last time for the next prompt.
    pub fn disable_schedule(&mut self) {
        self.schedule_active = false;
    }

    /// Reset fields that violate the record invariants to their defaults.
    ///
    /// Returns the names of the fields that were reset.
    pub fn sanitize(&mut self) -> Vec<&'static str> {
        let defaults = Config::default();
        let mut reset = Vec::new();
        if self.context_size < MIN_CONTEXT_SIZE {
            self.context_size = defaults.context_size;
            reset.push("context_size");
        }
        if self.threads < MIN_THREADS {
            self.threads = defaults.threads;
            reset.push("threads");
        }
        if self.port == 0 {
            self.port = defaults.port;
            reset.push("port");
        }
        if self.host_ip.trim().is_empty() {
            self.host_ip = defaults.host_ip;
            reset.push("host_ip");
        }
        if !self.schedule_time.is_empty() && self.schedule().is_none() {
            self.schedule_time = String::new();
            reset.push("schedule_time");
        }
        if self.schedule_active && self.schedule().is_none() {
            self.schedule_active = false;
            reset.push("schedule_active");
        }
        if !reset.is_empty() {
            warn!("settings fields reset to defaults (fields={})", reset.join(","));
        }
        reset
    }
}

/// Logical core count of the host, at least one.
pub fn default_thread_count() -> u32 {
    std::thread::available_parallelism()
        .map(|count| u32::try_from(count.get()).unwrap_or(u32::MAX))
        .unwrap_or(MIN_THREADS)
}

/// Parse a GPU layer count (0 or greater).
pub fn parse_gpu_layers(input: &str) -> Result<u32, ValidationError> {
    parse_bounded(input, 0)
}

/// Parse a CPU thread count (1 or greater).
pub fn parse_threads(input: &str) -> Result<u32, ValidationError> {
    parse_bounded(input, MIN_THREADS)
}

/// Parse a context window size (512 or greater).
pub fn parse_context_size(input: &str) -> Result<u32, ValidationError> {
    parse_bounded(input, MIN_CONTEXT_SIZE)
}

/// Parse a TCP port in 1..=65535.
pub fn parse_port(input: &str) -> Result<u16, ValidationError> {
    let value: i64 = input
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidNumber)?;
    match u16::try_from(value) {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ValidationError::InvalidPort),
    }
}

/// Accept any non-blank host string.
pub fn parse_host(input: &str) -> Result<String, ValidationError> {
    let host = input.trim();
    if host.is_empty() {
        return Err(ValidationError::EmptyHost);
    }
    Ok(host.to_string())
}

/// Resolve `input` to an absolute existing directory.
pub fn parse_directory(input: &str) -> Result<PathBuf, ValidationError> {
    let path = Path::new(input.trim());
    if !path.is_dir() {
        return Err(ValidationError::InvalidDirectory);
    }
    std::path::absolute(path).map_err(|_| ValidationError::InvalidDirectory)
}

fn parse_bounded(input: &str, min: u32) -> Result<u32, ValidationError> {
    let value: i64 = input
        .trim()
        .parse()
        .map_err(|_| ValidationError::InvalidNumber)?;
    if value < i64::from(min) {
        return Err(ValidationError::BelowMinimum { min });
    }
    u32::try_from(value).map_err(|_| ValidationError::InvalidNumber)
}
