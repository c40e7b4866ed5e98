//! Terminal console for a single `llama-server` process.
//!
//! [`run`] loads the persisted settings, takes over the terminal and drives
//! the console until the operator quits. Input and a 50 ms tick arrive over
//! one channel; the loop is the only owner of the session state.

mod app;
mod event;
mod ui;

use anyhow::anyhow;
use app::{App, Command};
use chrono::Local;
use crossterm::event::Event as CrosstermEvent;
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use event::AppEvent;
use llamatui_rs_config::{ConfigStore, ScheduleTime};
use llamatui_rs_supervisor::ServerSupervisor;
use log::{debug, info, warn};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Interval between housekeeping ticks.
pub const TICK_RATE: Duration = Duration::from_millis(50);

/// Startup overrides for a console session.
#[derive(Debug, Clone, Default)]
pub struct ConsoleOptions {
    /// Settings file to use instead of `~/.llamatui/config.json5`.
    pub config_path: Option<PathBuf>,
    /// Model directory to scan instead of the persisted one.
    pub models_dir: Option<PathBuf>,
}

/// Run the console until the operator quits.
///
/// # Errors
/// Returns an error if the terminal cannot be set up or drawn to.
pub async fn run(options: ConsoleOptions) -> anyhow::Result<()> {
    let store = options
        .config_path
        .clone()
        .map(ConfigStore::new)
        .unwrap_or_else(ConfigStore::at_default_location);
    let mut loaded = store.load();
    if let Some(dir) = options.models_dir.as_ref() {
        let dir = std::path::absolute(dir).unwrap_or_else(|_| dir.clone());
        info!("model directory overridden (dir={})", dir.display());
        loaded.config.model_dir = dir;
    }
    let mut app = App::new(store, loaded, ServerSupervisor::new());

    let mut terminal = setup_terminal()?;
    let (tx, mut rx) = mpsc::channel(256);
    spawn_input_handler(tx.clone());
    spawn_tick(tx.clone());

    let result = event_loop(&mut terminal, &mut app, &mut rx, &tx).await;
    if result.is_err() {
        app.shutdown().await;
    }
    restore_terminal(&mut terminal)?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    rx: &mut mpsc::Receiver<AppEvent>,
    tx: &mpsc::Sender<AppEvent>,
) -> anyhow::Result<()> {
    loop {
        terminal.draw(|frame| ui::draw(frame, app))?;
        let event = rx
            .recv()
            .await
            .ok_or_else(|| anyhow!("event channel closed unexpectedly"))?;
        if handle_app_event(event, app, tx).await {
            return Ok(());
        }
    }
}

/// Dispatch a console event and return true when the console should exit.
async fn handle_app_event(
    event: AppEvent,
    app: &mut App,
    sender: &mpsc::Sender<AppEvent>,
) -> bool {
    match event {
        AppEvent::Input(key) => match app.handle_key(key) {
            Some(Command::Start) => {
                app.start_server();
                false
            }
            Some(Command::Stop) => {
                app.stop_server().await;
                false
            }
            Some(Command::ShowTelemetry) => {
                spawn_telemetry(app, sender.clone());
                false
            }
            Some(Command::Quit) => {
                app.shutdown().await;
                true
            }
            None => false,
        },
        AppEvent::Tick => {
            let now = ScheduleTime::from_time(Local::now().time());
            app.on_tick(now, Instant::now());
            false
        }
        AppEvent::Telemetry { run, lines } => {
            debug!("telemetry received (run={run}, lines={})", lines.len());
            app.set_telemetry(run, lines);
            false
        }
    }
}

/// Run the telemetry probe off the loop and post its output back.
fn spawn_telemetry(app: &App, sender: mpsc::Sender<AppEvent>) {
    let probe = app.telemetry_probe.clone();
    let run = app.telemetry_run();
    tokio::spawn(async move {
        let lines = probe.lines().await;
        if sender.send(AppEvent::Telemetry { run, lines }).await.is_err() {
            warn!("telemetry dropped, console already closed");
        }
    });
}

fn spawn_input_handler(sender: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        loop {
            if matches!(crossterm::event::poll(Duration::from_millis(30)), Ok(true)) {
                while matches!(crossterm::event::poll(Duration::from_millis(0)), Ok(true)) {
                    let event = match crossterm::event::read() {
                        Ok(event) => event,
                        Err(_) => break,
                    };
                    if let CrosstermEvent::Key(key) = event
                        && sender.send(AppEvent::Input(key)).await.is_err()
                    {
                        return;
                    }
                }
            }
            if sender.is_closed() {
                return;
            }
        }
    });
}

fn spawn_tick(sender: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_RATE);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if sender.send(AppEvent::Tick).await.is_err() {
                return;
            }
        }
    });
}

/// Configure terminal in raw mode with alternate screen.
fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    debug!("setting up terminal");
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(err) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(err.into());
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;
    Ok(terminal)
}

/// Restore terminal state on exit.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    debug!("restoring terminal");
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
