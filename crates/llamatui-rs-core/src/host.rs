//! Host memory summary for the header line.

use sysinfo::System;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Cached memory statistics of the host.
pub struct HostMemory {
    sys: System,
}

impl std::fmt::Debug for HostMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostMemory").finish_non_exhaustive()
    }
}

impl Default for HostMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl HostMemory {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        Self { sys }
    }

    pub fn refresh(&mut self) {
        self.sys.refresh_memory();
    }

    pub fn summary(&self) -> String {
        format_memory(self.sys.available_memory(), self.sys.total_memory())
    }
}

/// Render available and total bytes as `RAM: 12.3GB Free / 31.2GB Total (60.6%)`.
pub fn format_memory(available: u64, total: u64) -> String {
    if total == 0 {
        return "RAM: N/A".to_string();
    }
    let available = available.min(total);
    let used_percent = (total - available) as f64 / total as f64 * 100.0;
    format!(
        "RAM: {:.1}GB Free / {:.1}GB Total ({:.1}%)",
        available as f64 / BYTES_PER_GB,
        total as f64 / BYTES_PER_GB,
        used_percent
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_gigabytes_and_usage() {
        let gb = 1024 * 1024 * 1024;
        assert_eq!(
            format_memory(8 * gb, 32 * gb),
            "RAM: 8.0GB Free / 32.0GB Total (75.0%)"
        );
    }

    #[test]
    fn unknown_total_is_not_available() {
        assert_eq!(format_memory(0, 0), "RAM: N/A");
    }
}
