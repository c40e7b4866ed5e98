//! Daily automatic launch.

use llamatui_rs_config::{Config, ScheduleTime};
use log::info;
use std::time::{Duration, Instant};

/// Quiet period after a scheduled launch, so the same minute fires once.
pub const SCHEDULE_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    cooldown_until: Option<Instant>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the server should be launched now.
    ///
    /// A `true` result arms the cooldown; the caller is expected to start the
    /// server right away.
    pub fn due(&mut self, config: &Config, running: bool, now: ScheduleTime, at: Instant) -> bool {
        if running || !config.schedule_active {
            return false;
        }
        if let Some(until) = self.cooldown_until {
            if at < until {
                return false;
            }
            self.cooldown_until = None;
        }
        let Some(target) = config.schedule() else {
            return false;
        };
        if target != now {
            return false;
        }
        info!("scheduled launch due (time={target})");
        self.cooldown_until = Some(at + SCHEDULE_COOLDOWN);
        true
    }

    pub fn in_cooldown(&self, at: Instant) -> bool {
        self.cooldown_until.is_some_and(|until| at < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn armed(time: &str) -> Config {
        let mut config = Config::default();
        config.enable_schedule(time).expect("valid time");
        config
    }

    fn hhmm(input: &str) -> ScheduleTime {
        ScheduleTime::parse(input).expect("valid time")
    }

    #[test]
    fn fires_once_per_minute() {
        let config = armed("08:00");
        let mut scheduler = Scheduler::new();
        let start = Instant::now();

        assert!(!scheduler.due(&config, false, hhmm("07:59"), start));
        assert!(scheduler.due(&config, false, hhmm("08:00"), start));
        assert!(scheduler.in_cooldown(start));
        assert!(!scheduler.due(&config, false, hhmm("08:00"), start + Duration::from_secs(30)));
        assert!(scheduler.due(&config, false, hhmm("08:00"), start + SCHEDULE_COOLDOWN));
    }

    #[test]
    fn never_fires_while_running_or_disarmed() {
        let mut config = armed("08:00");
        let mut scheduler = Scheduler::new();
        let now = Instant::now();
        assert!(!scheduler.due(&config, true, hhmm("08:00"), now));

        config.disable_schedule();
        assert!(!scheduler.due(&config, false, hhmm("08:00"), now));
        assert!(!scheduler.in_cooldown(now));
    }
}
