//! Rendering routines for the console.

use crate::app::{App, Focus, Mode, SPINNER_CELLS, TELEMETRY_PENDING};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};

const PRIMARY: Color = Color::Rgb(236, 91, 43); // #EC5B2B
const SECONDARY: Color = Color::Rgb(238, 121, 72); // #EE7948
const TEXT: Color = Color::Rgb(238, 238, 238); // #eeeeee
const TEXT_MUTED: Color = Color::Rgb(128, 128, 128); // #808080
const BORDER: Color = Color::Rgb(60, 60, 60); // #3c3c3c
const BORDER_ACTIVE: Color = Color::Rgb(238, 121, 72); // #EE7948
const YELLOW: Color = Color::Rgb(229, 192, 123); // #e5c07b
const GREEN: Color = Color::Rgb(120, 220, 140);
const RED: Color = Color::Rgb(255, 110, 110);
const CYAN: Color = Color::Rgb(86, 182, 194);

const SPINNER_COLORS: [Color; SPINNER_CELLS] = [PRIMARY, SECONDARY, YELLOW, GREEN, CYAN, RED];

pub const MIN_WIDTH: u16 = 80;
pub const MIN_HEIGHT: u16 = 20;

const HEADER_HEIGHT: u16 = 1;
const CONTROLS_HEIGHT: u16 = 5;
const STATUS_WIDTH: u16 = 36;
const MODEL_LIST_PERCENT: u16 = 65;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const KEYS_HINT: &str = "TAB:Switch Section | ENTER:Edit/Select | ARROWS:Navigate";
const COMMANDS_HINT: &str =
    "[S]START [K]KILL [V]VIEW LOG [N]NVIDIA-SMI [D]SERVER DIR [R]RESCAN [Q]QUIT";

/// Draw the entire frame for the current mode.
pub fn draw(frame: &mut Frame<'_>, app: &mut App) {
    let area = frame.area();
    match app.mode {
        Mode::LogView => draw_log_view(frame, app, area),
        Mode::TelemetryView => draw_telemetry_view(frame, app, area),
        Mode::Main => {
            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                draw_too_small(frame, area);
                return;
            }
            let root = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(HEADER_HEIGHT),   // header bar
                    Constraint::Min(0),                  // models + settings
                    Constraint::Length(CONTROLS_HEIGHT), // controls + status
                ])
                .split(area);
            let body = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Percentage(MODEL_LIST_PERCENT),
                    Constraint::Percentage(100 - MODEL_LIST_PERCENT),
                ])
                .split(root[1]);

            draw_header(frame, app, root[0]);
            draw_model_list(frame, app, body[0]);
            draw_settings(frame, app, body[1]);
            draw_controls(frame, app, root[2]);
        }
    }
}

fn draw_too_small(frame: &mut Frame<'_>, area: Rect) {
    let warning = Paragraph::new(Line::from(Span::styled(
        format!("Window too small. Resize > {MIN_WIDTH}x{MIN_HEIGHT}"),
        Style::default().fg(YELLOW).add_modifier(Modifier::BOLD),
    )));
    frame.render_widget(warning, area);
}

fn draw_header(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let bar = Style::default().bg(Color::Rgb(30, 30, 30));
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(STATUS_WIDTH)])
        .split(area);

    let title = Line::from(vec![
        Span::styled(
            " LLAMA-SERVER CONSOLE",
            Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" v{VERSION}"), Style::default().fg(TEXT_MUTED)),
        Span::styled(" | ", Style::default().fg(TEXT_MUTED)),
        Span::styled(app.memory_summary.as_str(), Style::default().fg(TEXT)),
    ]);
    frame.render_widget(Paragraph::new(title).style(bar), cols[0]);

    // Server state on the right: RUNNING with pid and activity dots, or STOPPED
    let state = match app.supervisor.handle() {
        Some(handle) => {
            let mut spans = vec![
                Span::styled(
                    "● RUNNING",
                    Style::default().fg(GREEN).add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!(" PID {} ", handle.pid), Style::default().fg(TEXT)),
            ];
            spans.extend(spinner_spans(app.spinner));
            Line::from(spans)
        }
        None => Line::from(Span::styled("● STOPPED", Style::default().fg(RED))),
    };
    frame.render_widget(Paragraph::new(state).style(bar), cols[1]);
}

fn panel<'a>(title: String, active: bool) -> Block<'a> {
    let border = if active { BORDER_ACTIVE } else { BORDER };
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .title(Span::styled(
            title,
            Style::default().fg(TEXT_MUTED).add_modifier(Modifier::BOLD),
        ))
}

fn draw_model_list(frame: &mut Frame<'_>, app: &mut App, area: Rect) {
    let focused = app.focus == Focus::ModelList;
    let block = panel(
        format!(" GGUF Models List ({}) ", app.models.len()),
        focused,
    );
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = inner.height as usize;
    app.models.scroll_into_view(rows);
    let selected = app.models.selected_index();

    let mut lines: Vec<Line<'_>> = Vec::new();
    for (idx, model) in app.models.visible(rows) {
        let running = app.is_running_model(model);
        let text = format!(" {model}");
        let style = match (idx == selected, running) {
            (true, true) => Style::default()
                .fg(Color::Rgb(10, 10, 10))
                .bg(GREEN)
                .add_modifier(Modifier::BOLD),
            (true, false) if focused => Style::default()
                .fg(Color::Rgb(10, 10, 10))
                .bg(PRIMARY)
                .add_modifier(Modifier::BOLD),
            (true, false) => Style::default().fg(SECONDARY),
            (false, true) => Style::default().fg(GREEN).add_modifier(Modifier::BOLD),
            (false, false) => Style::default().fg(TEXT),
        };
        lines.push(Line::from(Span::styled(text, style)));
    }
    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            format!(" no .gguf files in {}", app.config.model_dir.display()),
            Style::default().fg(TEXT_MUTED),
        )));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn setting<'a>(app: &App, target: Focus, label: &'a str, value: String) -> Line<'a> {
    let label_style = if app.focus == target {
        Style::default()
            .fg(Color::Rgb(10, 10, 10))
            .bg(PRIMARY)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(TEXT_MUTED)
    };
    Line::from(vec![
        Span::styled(label, label_style),
        Span::raw(" "),
        Span::styled(value, Style::default().fg(TEXT)),
    ])
}

fn draw_settings(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let focused = app.focus != Focus::ModelList;
    let block = panel(" Configuration (Tab, Enter to change) ".to_string(), focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let config = &app.config;
    let schedule = if config.schedule_active {
        format!("ON ({})", config.schedule_time)
    } else {
        "OFF".to_string()
    };
    let (lan_text, lan_color) = if config.allow_lan {
        ("ENABLED", GREEN)
    } else {
        ("DISABLED", RED)
    };
    let lan_label_style = if app.focus == Focus::Lan {
        Style::default()
            .fg(Color::Rgb(10, 10, 10))
            .bg(PRIMARY)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(TEXT_MUTED)
    };

    let lines = vec![
        setting(
            app,
            Focus::ModelDir,
            "Model Dir:",
            config.model_dir.display().to_string(),
        ),
        setting(
            app,
            Focus::Backend,
            "Backend:",
            format!("[{}]", config.backend),
        ),
        setting(
            app,
            Focus::GpuLayers,
            "GPU Layers (-ngl):",
            config.gpu_layers.to_string(),
        ),
        setting(
            app,
            Focus::Threads,
            "CPU Threads (-t):",
            config.threads.to_string(),
        ),
        setting(
            app,
            Focus::ContextSize,
            "Context Size (-c):",
            config.context_size.to_string(),
        ),
        setting(app, Focus::HostIp, "IP:", config.host_ip.clone()),
        setting(app, Focus::Port, "Port:", config.port.to_string()),
        Line::from(vec![
            Span::styled("LAN:", lan_label_style),
            Span::raw(" "),
            Span::styled(lan_text, Style::default().fg(lan_color)),
        ]),
        setting(app, Focus::Schedule, "Schedule Starting:", schedule),
        setting(
            app,
            Focus::ServerDir,
            "Llama-Server Binary Dir:",
            config.server_dir.display().to_string(),
        ),
    ];

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Moving row of colored dots shown while the server runs.
fn spinner_spans(active: usize) -> Vec<Span<'static>> {
    (0..SPINNER_CELLS)
        .map(|idx| {
            let color = SPINNER_COLORS[(active + idx) % SPINNER_CELLS];
            let mut style = Style::default().fg(color);
            if idx == 0 {
                style = style.add_modifier(Modifier::BOLD);
            }
            Span::styled("● ", style)
        })
        .collect()
}

fn draw_controls(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let block = panel(" Controls ".to_string(), false);
    let last = match &app.prompt {
        Some(prompt) => Line::from(vec![
            Span::styled(
                format!("{} ", prompt.field.label()),
                Style::default().fg(YELLOW).add_modifier(Modifier::BOLD),
            ),
            Span::styled(prompt.input.as_str(), Style::default().fg(TEXT)),
            Span::styled("█", Style::default().fg(PRIMARY)),
        ]),
        None => Line::from(Span::styled(
            format!("> {}", app.status),
            Style::default().fg(CYAN),
        )),
    };
    let lines = vec![
        Line::from(Span::styled(KEYS_HINT, Style::default().fg(TEXT_MUTED))),
        Line::from(Span::styled(
            COMMANDS_HINT,
            Style::default().fg(TEXT).add_modifier(Modifier::BOLD),
        )),
        last,
    ];
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn full_screen_block<'a>(title: &'a str) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER))
        .title(Span::styled(
            title,
            Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD),
        ))
}

fn draw_log_view(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let block = full_screen_block(" Server Log (Press ANY Key to return) ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line<'_>> = app
        .log_tail(inner.height as usize)
        .into_iter()
        .map(|line| Line::from(Span::styled(line, Style::default().fg(TEXT))))
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_telemetry_view(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let block =
        full_screen_block(" NVIDIA System Management Interface (Press ANY Key to return) ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line<'_>> = match &app.telemetry {
        Some(output) => output
            .iter()
            .take(inner.height as usize)
            .map(|line| Line::from(Span::styled(line.as_str(), Style::default().fg(TEXT))))
            .collect(),
        None => vec![Line::from(Span::styled(
            TELEMETRY_PENDING,
            Style::default().fg(TEXT_MUTED),
        ))],
    };
    frame.render_widget(Paragraph::new(lines), inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use llamatui_rs_config::{Config, ConfigStore, LoadStatus, Loaded};
    use llamatui_rs_supervisor::ServerSupervisor;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn app_in(temp: &tempfile::TempDir) -> App {
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
        App::new(
            ConfigStore::new(temp.path().join("config.json5")),
            loaded,
            ServerSupervisor::new(),
        )
    }

    fn render(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).expect("terminal");
        terminal.draw(|frame| draw(frame, app)).expect("draw");
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn small_terminal_shows_warning() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut app = app_in(&temp);
        let screen = render(&mut app, 60, 15);
        assert!(screen.contains("Window too small. Resize > 80x20"));
    }

    #[test]
    fn main_screen_lists_models_and_status() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("tiny.gguf"), b"GGUF").expect("write");
        let mut app = app_in(&temp);
        app.refresh_models();
        let screen = render(&mut app, 120, 30);
        assert!(screen.contains("GGUF Models List (1)"));
        assert!(screen.contains("tiny.gguf [0.00 GB]"));
        assert!(screen.contains("● STOPPED"));
        assert!(screen.contains("No persistent settings found. Using defaults."));
    }

    #[test]
    fn telemetry_view_shows_pending_then_output() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut app = app_in(&temp);
        let run = app.show_telemetry();
        assert!(render(&mut app, 100, 20).contains(TELEMETRY_PENDING));
        app.set_telemetry(run, vec!["GPU 0: Fake Card".to_string()]);
        assert!(render(&mut app, 100, 20).contains("GPU 0: Fake Card"));
    }
}
