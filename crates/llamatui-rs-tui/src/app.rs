//! Console session state and key dispatch.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use llamatui_rs_config::{
    Config, ConfigStore, DEFAULT_SCHEDULE_TIME, LoadStatus, Loaded, ScheduleTime,
    parse_context_size, parse_directory, parse_gpu_layers, parse_host, parse_port, parse_threads,
};
use llamatui_rs_core::{HostMemory, ModelFile, ModelRegistry, Scheduler, TelemetryProbe};
use llamatui_rs_supervisor::ServerSupervisor;
use log::{debug, info, warn};
use std::time::Instant;

pub const TELEMETRY_PENDING: &str = "Running nvidia-smi...";

/// Number of activity indicator cells.
pub const SPINNER_CELLS: usize = 6;
/// Ticks between host memory refreshes.
const MEMORY_REFRESH_TICKS: u64 = 20;

/// Top-level display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Main,
    LogView,
    TelemetryView,
}

/// Element receiving navigation and edit input on the main screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    ModelList,
    ModelDir,
    Backend,
    GpuLayers,
    Threads,
    ContextSize,
    HostIp,
    Port,
    Lan,
    Schedule,
    ServerDir,
}

impl Focus {
    /// Tab order.
    pub const ALL: [Focus; 11] = [
        Focus::ModelList,
        Focus::ModelDir,
        Focus::Backend,
        Focus::GpuLayers,
        Focus::Threads,
        Focus::ContextSize,
        Focus::HostIp,
        Focus::Port,
        Focus::Lan,
        Focus::Schedule,
        Focus::ServerDir,
    ];

    fn position(self) -> usize {
        Self::ALL
            .iter()
            .position(|focus| *focus == self)
            .unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.position() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Setting edited through the line prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ModelDir,
    GpuLayers,
    Threads,
    ContextSize,
    HostIp,
    Port,
    Schedule,
    ServerDir,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::ModelDir => "Full Path to Models:",
            Field::GpuLayers => "Number of GPU Layers (-ngl):",
            Field::Threads => "Number of CPU Threads (-t):",
            Field::ContextSize => "Context Size (-c) [4096 is common]:",
            Field::HostIp => "Host IP:",
            Field::Port => "Port:",
            Field::Schedule => "Start Time (HH:MM):",
            Field::ServerDir => "Full Path to llama-server binary directory:",
        }
    }
}

/// Open line-edit prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub field: Field,
    pub input: String,
}

/// Work the event loop performs on behalf of a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    ShowTelemetry,
    Quit,
}

/// All state of one console session.
pub struct App {
    pub mode: Mode,
    pub focus: Focus,
    pub prompt: Option<Prompt>,
    pub status: String,
    pub config: Config,
    pub models: ModelRegistry,
    pub supervisor: ServerSupervisor,
    /// Telemetry output; `None` while a run is in flight.
    pub telemetry: Option<Vec<String>>,
    pub memory_summary: String,
    pub spinner: usize,
    pub telemetry_probe: TelemetryProbe,
    store: ConfigStore,
    scheduler: Scheduler,
    memory: HostMemory,
    ticks: u64,
    telemetry_run: u64,
}

impl App {
    pub fn new(store: ConfigStore, loaded: Loaded, supervisor: ServerSupervisor) -> Self {
        if let LoadStatus::Corrupt(reason) = &loaded.status {
            warn!("settings unreadable, using defaults (reason={reason})");
        }
        let mut status = loaded.message(store.path());
        if let Some(err) = &loaded.save_error {
            status = format!("Settings not saved: {err}");
        }

        let memory = HostMemory::new();
        let mut app = Self {
            mode: Mode::Main,
            focus: Focus::ModelList,
            prompt: None,
            status,
            config: loaded.config,
            models: ModelRegistry::new(),
            supervisor,
            telemetry: None,
            memory_summary: memory.summary(),
            spinner: 0,
            telemetry_probe: TelemetryProbe::default(),
            store,
            scheduler: Scheduler::new(),
            memory,
            ticks: 0,
            telemetry_run: 0,
        };
        let _ = app.refresh_models();
        app
    }

    pub fn is_running(&self) -> bool {
        self.supervisor.is_running()
    }

    /// Rescan the model directory, reporting failures on the status line.
    pub fn refresh_models(&mut self) -> bool {
        match self.models.refresh(&self.config.model_dir) {
            Ok(count) => {
                debug!(
                    "model list refreshed (dir={}, count={count})",
                    self.config.model_dir.display()
                );
                true
            }
            Err(err) => {
                warn!("model list refresh failed (err={err})");
                self.status = err.to_string();
                false
            }
        }
    }

    /// Launch the selected model.
    pub fn start_server(&mut self) {
        let model = self.models.selected().map(|model| model.path.clone());
        match self.supervisor.start(&self.config, model.as_deref()) {
            Ok(handle) => {
                let name = handle
                    .model_path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| handle.model_path.display().to_string());
                self.status = format!("SERVING: {name} - Press 'V' to view log.");
            }
            Err(err) => {
                warn!("server start failed (err={err})");
                self.status = err.to_string();
            }
        }
    }

    pub async fn stop_server(&mut self) {
        match self.supervisor.stop().await {
            Ok(report) => self.status = report.message().to_string(),
            Err(err) => {
                warn!("server stop failed (err={err})");
                self.status = err.to_string();
            }
        }
        if !self.is_running() && self.mode == Mode::LogView {
            self.mode = Mode::Main;
        }
    }

    /// Stop any server and persist the settings before exiting.
    pub async fn shutdown(&mut self) {
        if self.is_running() {
            self.stop_server().await;
        }
        self.save();
        info!("console shut down");
    }

    /// Persist the settings; a failure is reported on the status line.
    pub fn save(&mut self) -> bool {
        match self.store.save(&self.config) {
            Ok(()) => true,
            Err(err) => {
                warn!("settings save failed (err={err})");
                self.status = format!("Settings not saved: {err}");
                false
            }
        }
    }

    /// Whether `model` is the file the running server was launched with.
    pub fn is_running_model(&self, model: &ModelFile) -> bool {
        let Some(running) = self.supervisor.running_model() else {
            return false;
        };
        running == model.path
    }

    /// Enter the telemetry view for a new run, returning the run's id.
    pub fn show_telemetry(&mut self) -> u64 {
        self.mode = Mode::TelemetryView;
        self.telemetry = None;
        self.telemetry_run = self.telemetry_run.wrapping_add(1);
        self.telemetry_run
    }

    /// Id of the most recent telemetry run.
    pub fn telemetry_run(&self) -> u64 {
        self.telemetry_run
    }

    /// Accept output of run `run`; results of superseded runs are dropped.
    pub fn set_telemetry(&mut self, run: u64, lines: Vec<String>) -> bool {
        if run != self.telemetry_run {
            debug!("stale telemetry dropped (run={run}, current={})", self.telemetry_run);
            return false;
        }
        self.telemetry = Some(lines);
        true
    }

    /// Newest `rows` lines of the running server's log.
    pub fn log_tail(&self, rows: usize) -> Vec<String> {
        self.supervisor
            .logs()
            .map(|logs| logs.tail(rows))
            .unwrap_or_default()
    }

    /// Periodic housekeeping: exit detection, the schedule and the header.
    pub fn on_tick(&mut self, now: ScheduleTime, at: Instant) {
        self.ticks = self.ticks.wrapping_add(1);

        if let Some(exit) = self.supervisor.poll_exit() {
            let name = exit
                .model_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| exit.model_path.display().to_string());
            self.status = format!("Server exited unexpectedly ({}): {name}", exit.status);
            if self.mode == Mode::LogView {
                self.mode = Mode::Main;
            }
        }

        if self
            .scheduler
            .due(&self.config, self.is_running(), now, at)
        {
            info!("starting scheduled server (time={now})");
            self.start_server();
        }

        if self.is_running() {
            self.spinner = (self.spinner + 1) % SPINNER_CELLS;
        }

        if self.ticks % MEMORY_REFRESH_TICKS == 0 {
            self.memory.refresh();
            self.memory_summary = self.memory.summary();
        }
    }

    /// Apply a key press, returning any work the event loop must perform.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Command> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return Some(Command::Quit);
        }
        if self.mode != Mode::Main {
            self.mode = Mode::Main;
            return None;
        }
        if self.prompt.is_some() {
            self.handle_prompt_key(key);
            return None;
        }

        match key.code {
            KeyCode::Char(c) => match c.to_ascii_lowercase() {
                'q' => Some(Command::Quit),
                's' => Some(Command::Start),
                'k' => Some(Command::Stop),
                'v' => {
                    if self.is_running() {
                        self.mode = Mode::LogView;
                    } else {
                        self.status = "Server is not running. Start it first.".to_string();
                    }
                    None
                }
                'n' => {
                    self.show_telemetry();
                    Some(Command::ShowTelemetry)
                }
                'd' => {
                    self.open_prompt(Field::ServerDir);
                    None
                }
                'r' => {
                    if self.refresh_models() {
                        self.status = format!("Found {} model(s).", self.models.len());
                    }
                    None
                }
                _ => None,
            },
            KeyCode::Tab => {
                self.focus = self.focus.next();
                None
            }
            KeyCode::BackTab => {
                self.focus = self.focus.prev();
                None
            }
            KeyCode::Up | KeyCode::Left => {
                if self.focus == Focus::ModelList {
                    self.models.select_prev();
                }
                None
            }
            KeyCode::Down | KeyCode::Right => {
                if self.focus == Focus::ModelList {
                    self.models.select_next();
                }
                None
            }
            KeyCode::Enter => {
                self.activate_focus();
                None
            }
            _ => None,
        }
    }

    fn activate_focus(&mut self) {
        match self.focus {
            Focus::ModelList => {}
            Focus::ModelDir => self.open_prompt(Field::ModelDir),
            Focus::Backend => {
                self.config.backend = self.config.backend.next();
                self.status = format!("Backend set to {}.", self.config.backend);
                self.save();
            }
            Focus::GpuLayers => self.open_prompt(Field::GpuLayers),
            Focus::Threads => self.open_prompt(Field::Threads),
            Focus::ContextSize => self.open_prompt(Field::ContextSize),
            Focus::HostIp => self.open_prompt(Field::HostIp),
            Focus::Port => self.open_prompt(Field::Port),
            Focus::Lan => {
                self.config.allow_lan = !self.config.allow_lan;
                self.status = if self.config.allow_lan {
                    "LAN access enabled.".to_string()
                } else {
                    "LAN access disabled.".to_string()
                };
                self.save();
            }
            Focus::Schedule => {
                if self.config.schedule_active {
                    self.config.disable_schedule();
                    self.status = "Schedule disabled.".to_string();
                    self.save();
                } else {
                    self.open_prompt(Field::Schedule);
                }
            }
            Focus::ServerDir => self.open_prompt(Field::ServerDir),
        }
    }

    fn open_prompt(&mut self, field: Field) {
        let input = match field {
            Field::ModelDir => self.config.model_dir.display().to_string(),
            Field::GpuLayers => self.config.gpu_layers.to_string(),
            Field::Threads => self.config.threads.to_string(),
            Field::ContextSize => self.config.context_size.to_string(),
            Field::HostIp => self.config.host_ip.clone(),
            Field::Port => self.config.port.to_string(),
            Field::Schedule => DEFAULT_SCHEDULE_TIME.to_string(),
            Field::ServerDir => self.config.server_dir.display().to_string(),
        };
        self.prompt = Some(Prompt { field, input });
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let Some(prompt) = self.prompt.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char(c) => prompt.input.push(c),
            KeyCode::Backspace => {
                prompt.input.pop();
            }
            KeyCode::Esc => {
                self.prompt = None;
            }
            KeyCode::Enter => {
                if let Some(prompt) = self.prompt.take() {
                    self.submit_prompt(prompt);
                }
            }
            _ => {}
        }
    }

    fn submit_prompt(&mut self, prompt: Prompt) {
        let input = prompt.input.trim();
        if input.is_empty() {
            self.status = "No changes made.".to_string();
            return;
        }
        match self.apply_field(prompt.field, input) {
            Ok(message) => {
                self.status = message;
                self.save();
            }
            Err(err) => {
                debug!("field edit rejected (field={:?}, err={err})", prompt.field);
                self.status = err.to_string();
            }
        }
    }

    /// Validate `input` and store it, returning the status text.
    ///
    /// Nothing is stored when validation or the model rescan fails.
    fn apply_field(&mut self, field: Field, input: &str) -> anyhow::Result<String> {
        let message = match field {
            Field::ModelDir => {
                let dir = parse_directory(input)?;
                let count = self.models.refresh(&dir)?;
                debug!("model list refreshed (dir={}, count={count})", dir.display());
                self.config.model_dir = dir;
                "Directory updated.".to_string()
            }
            Field::GpuLayers => {
                self.config.gpu_layers = parse_gpu_layers(input)?;
                format!(
                    "GPU Layers set to {} (0=auto/CPU only).",
                    self.config.gpu_layers
                )
            }
            Field::Threads => {
                self.config.threads = parse_threads(input)?;
                format!("CPU Threads set to {}.", self.config.threads)
            }
            Field::ContextSize => {
                self.config.context_size = parse_context_size(input)?;
                format!("Context Size set to {}.", self.config.context_size)
            }
            Field::HostIp => {
                self.config.host_ip = parse_host(input)?;
                format!("Host IP set to {}.", self.config.host_ip)
            }
            Field::Port => {
                self.config.port = parse_port(input)?;
                format!("Port set to {}.", self.config.port)
            }
            Field::Schedule => {
                let time = self.config.enable_schedule(input)?;
                format!("Scheduled for {time}")
            }
            Field::ServerDir => {
                self.config.server_dir = parse_directory(input)?;
                format!(
                    "Llama-server directory updated to: {}",
                    self.config.server_dir.display()
                )
            }
        };
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llamatui_rs_config::Backend;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn app_in(temp: &TempDir) -> App {
        let config = Config {
            model_dir: temp.path().to_path_buf(),
            server_dir: temp.path().to_path_buf(),
            ..Config::default()
        };
        let loaded = Loaded {
            config,
            status: LoadStatus::Missing,
            save_error: None,
        };
        let store = ConfigStore::new(temp.path().join("settings").join("config.json5"));
        App::new(store, loaded, ServerSupervisor::new())
    }

    fn press(app: &mut App, code: KeyCode) -> Option<Command> {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn clear_prompt(app: &mut App) {
        let len = app.prompt.as_ref().map(|p| p.input.len()).unwrap_or(0);
        for _ in 0..len {
            press(app, KeyCode::Backspace);
        }
    }

    fn focus(app: &mut App, target: Focus) {
        while app.focus != target {
            press(app, KeyCode::Tab);
        }
    }

    fn saved(temp: &TempDir) -> Config {
        let store = ConfigStore::new(temp.path().join("settings").join("config.json5"));
        store.load().config
    }

    #[test]
    fn focus_cycles_through_all_targets() {
        let mut focus = Focus::ModelList;
        for _ in 0..Focus::ALL.len() {
            focus = focus.next();
        }
        assert_eq!(focus, Focus::ModelList);
        assert_eq!(Focus::ModelList.prev(), Focus::ServerDir);
        assert_eq!(Focus::ServerDir.next(), Focus::ModelList);
    }

    #[test]
    fn command_keys_are_case_insensitive() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut app = app_in(&temp);
        assert_eq!(press(&mut app, KeyCode::Char('S')), Some(Command::Start));
        assert_eq!(press(&mut app, KeyCode::Char('k')), Some(Command::Stop));
        assert_eq!(press(&mut app, KeyCode::Char('Q')), Some(Command::Quit));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(app.handle_key(ctrl_c), Some(Command::Quit));
    }

    #[test]
    fn log_view_requires_running_server() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut app = app_in(&temp);
        press(&mut app, KeyCode::Char('v'));
        assert_eq!(app.mode, Mode::Main);
        assert_eq!(app.status, "Server is not running. Start it first.");
    }

    #[test]
    fn telemetry_view_is_dismissed_by_any_key() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut app = app_in(&temp);
        assert_eq!(
            press(&mut app, KeyCode::Char('n')),
            Some(Command::ShowTelemetry)
        );
        assert_eq!(app.mode, Mode::TelemetryView);
        assert!(app.telemetry.is_none());

        assert!(app.set_telemetry(app.telemetry_run(), vec!["GPU 0".to_string()]));
        assert_eq!(press(&mut app, KeyCode::Char('s')), None);
        assert_eq!(app.mode, Mode::Main);
    }

    #[test]
    fn stale_telemetry_is_dropped() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut app = app_in(&temp);
        let first = app.show_telemetry();
        press(&mut app, KeyCode::Esc);
        let second = app.show_telemetry();
        assert_ne!(first, second);

        assert!(!app.set_telemetry(first, vec!["old".to_string()]));
        assert!(app.telemetry.is_none());
        assert!(app.set_telemetry(second, vec!["new".to_string()]));
        assert_eq!(app.telemetry, Some(vec!["new".to_string()]));
    }

    #[test]
    fn startup_status_reflects_settings_load() {
        let temp = tempfile::tempdir().expect("tempdir");
        let app = app_in(&temp);
        assert_eq!(app.status, "No persistent settings found. Using defaults.");

        let store = ConfigStore::new(temp.path().join("settings").join("config.json5"));
        store.save(&app.config).expect("save");
        let loaded = store.load();
        assert_eq!(loaded.status, LoadStatus::Loaded);
        let app = App::new(store, loaded, ServerSupervisor::new());
        assert_eq!(app.status, "Settings loaded from config.json5.");
    }

    #[test]
    fn start_without_models_reports_on_status_line() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut app = app_in(&temp);
        app.start_server();
        assert_eq!(app.status, "No models found in current directory.");
        assert!(!app.is_running());
    }

    #[test]
    fn arrows_move_cursor_only_on_model_list() {
        let temp = tempfile::tempdir().expect("tempdir");
        for name in ["a.gguf", "b.gguf", "c.gguf"] {
            std::fs::write(temp.path().join(name), b"m").expect("write");
        }
        let mut app = app_in(&temp);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.models.selected_index(), 2);

        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Up);
        assert_eq!(app.models.selected_index(), 2);
    }

    #[test]
    fn backend_cycles_and_gpu_layers_persist() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut app = app_in(&temp);
        focus(&mut app, Focus::Backend);
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.config.backend, Backend::Vulkan);
        assert!(app.prompt.is_none());

        focus(&mut app, Focus::GpuLayers);
        press(&mut app, KeyCode::Enter);
        clear_prompt(&mut app);
        type_text(&mut app, "32");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.config.gpu_layers, 32);
        assert_eq!(app.status, "GPU Layers set to 32 (0=auto/CPU only).");

        let persisted = saved(&temp);
        assert_eq!(persisted.backend, Backend::Vulkan);
        assert_eq!(persisted.gpu_layers, 32);
    }

    #[test]
    fn invalid_numbers_keep_previous_value() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut app = app_in(&temp);
        focus(&mut app, Focus::ContextSize);

        press(&mut app, KeyCode::Enter);
        clear_prompt(&mut app);
        type_text(&mut app, "abc");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.status, "Invalid number format.");

        press(&mut app, KeyCode::Enter);
        clear_prompt(&mut app);
        type_text(&mut app, "256");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.status, "Value must be 512 or greater.");
        assert_eq!(app.config.context_size, 4096);
    }

    #[test]
    fn empty_submission_keeps_value() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut app = app_in(&temp);
        focus(&mut app, Focus::HostIp);
        press(&mut app, KeyCode::Enter);
        clear_prompt(&mut app);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.config.host_ip, "0.0.0.0");
        assert!(app.prompt.is_none());
    }

    #[test]
    fn escape_cancels_prompt() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut app = app_in(&temp);
        focus(&mut app, Focus::Port);
        press(&mut app, KeyCode::Enter);
        type_text(&mut app, "1");
        press(&mut app, KeyCode::Esc);
        assert!(app.prompt.is_none());
        assert_eq!(app.config.port, 8080);
    }

    #[test]
    fn schedule_toggle_validates_time() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut app = app_in(&temp);
        focus(&mut app, Focus::Schedule);

        press(&mut app, KeyCode::Enter);
        assert_eq!(
            app.prompt.as_ref().map(|p| p.input.as_str()),
            Some(DEFAULT_SCHEDULE_TIME)
        );
        clear_prompt(&mut app);
        type_text(&mut app, "25:61");
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.status, "Invalid time format. Use HH:MM");
        assert!(!app.config.schedule_active);

        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Enter);
        assert!(app.config.schedule_active);
        assert_eq!(app.status, "Scheduled for 08:00");

        press(&mut app, KeyCode::Enter);
        assert!(!app.config.schedule_active);
        assert_eq!(app.status, "Schedule disabled.");
    }

    #[test]
    fn model_dir_edit_rescans() {
        let temp = tempfile::tempdir().expect("tempdir");
        let other = temp.path().join("other");
        std::fs::create_dir(&other).expect("mkdir");
        std::fs::write(other.join("z.gguf"), b"m").expect("write");
        let mut app = app_in(&temp);
        assert!(app.models.is_empty());

        focus(&mut app, Focus::ModelDir);
        press(&mut app, KeyCode::Enter);
        clear_prompt(&mut app);
        type_text(&mut app, &other.display().to_string());
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.status, "Directory updated.");
        assert_eq!(app.models.len(), 1);

        press(&mut app, KeyCode::Enter);
        clear_prompt(&mut app);
        type_text(&mut app, &temp.path().join("missing").display().to_string());
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.status, "Invalid directory path.");
        assert_eq!(app.config.model_dir, other);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_model_dir_is_not_stored() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("kept.gguf"), b"m").expect("write");
        let locked = temp.path().join("locked");
        std::fs::create_dir(&locked).expect("mkdir");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).expect("chmod");
        let readable = std::fs::read_dir(&locked).is_ok();
        if readable {
            // permission bits are not enforced for this user
            std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755))
                .expect("chmod");
            return;
        }
        let mut app = app_in(&temp);
        assert_eq!(app.models.len(), 1);

        focus(&mut app, Focus::ModelDir);
        press(&mut app, KeyCode::Enter);
        clear_prompt(&mut app);
        type_text(&mut app, &locked.display().to_string());
        press(&mut app, KeyCode::Enter);
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).expect("chmod");

        assert!(app.status.starts_with("Error: cannot read"), "{}", app.status);
        assert_eq!(app.config.model_dir, temp.path());
        assert_eq!(app.models.len(), 1);
        assert!(!temp.path().join("settings").join("config.json5").exists());
    }

    #[test]
    fn server_dir_hotkey_opens_prompt() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut app = app_in(&temp);
        press(&mut app, KeyCode::Char('d'));
        assert_eq!(
            app.prompt.as_ref().map(|p| p.field),
            Some(Field::ServerDir)
        );
        // letters go to the prompt, not the command table
        assert_eq!(press(&mut app, KeyCode::Char('q')), None);
    }

    #[test]
    fn save_failure_is_reported() {
        let temp = tempfile::tempdir().expect("tempdir");
        let blocker = temp.path().join("settings");
        std::fs::write(&blocker, b"not a directory").expect("write");
        let mut app = app_in(&temp);
        assert!(!app.save());
        assert!(app.status.starts_with("Settings not saved"));
    }

    #[test]
    fn tick_without_server_keeps_spinner_still() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut app = app_in(&temp);
        let now = ScheduleTime::parse("12:00").expect("time");
        for _ in 0..3 {
            app.on_tick(now, Instant::now());
        }
        assert_eq!(app.spinner, 0);
        assert!(!app.memory_summary.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn serve_view_log_and_stop() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("tempdir");
        let binary = temp.path().join(llamatui_rs_supervisor::SERVER_BINARY_NAME);
        std::fs::write(&binary, "#!/bin/sh\necho 'server is listening'\nexec sleep 30\n")
            .expect("write script");
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755))
            .expect("chmod");
        std::fs::write(temp.path().join("tiny.gguf"), b"GGUF").expect("write model");
        let mut app = app_in(&temp);
        app.refresh_models();

        app.start_server();
        assert_eq!(app.status, "SERVING: tiny.gguf - Press 'V' to view log.");
        assert!(app.is_running());
        let running = app.models.selected().cloned().expect("model");
        assert!(app.is_running_model(&running));

        app.start_server();
        assert_eq!(app.status, "Server already running. Press 'K' first.");

        press(&mut app, KeyCode::Char('v'));
        assert_eq!(app.mode, Mode::LogView);
        for _ in 0..200 {
            if !app.log_tail(10).is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        }
        assert_eq!(app.log_tail(10), vec!["server is listening".to_string()]);

        app.stop_server().await;
        assert_eq!(app.status, "Server stopped and cache cleared.");
        assert_eq!(app.mode, Mode::Main);
        assert!(app.log_tail(10).is_empty());
    }
}
