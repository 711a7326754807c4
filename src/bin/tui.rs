//! nav-tui - terminal front end for the campus-nav daemon
//!
//! Polls `/api/view` and renders:
//! - status, basemap style and camera
//! - the turn instruction banner
//! - the quick navigation list (filtered by the search text)
//! - the selected building's route steps with the current step highlighted
//!
//! Keys: Up/Down move, Enter navigates, `/` edits the search, `c` clears the
//! destination, `s` cycles the basemap, `r` recenters, `+`/`-` zoom, `q` quits.

use campus_nav::presentation::{BasemapStyle, MapView, ViewStatus};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Terminal front end for campus-nav
#[derive(Parser, Debug)]
#[command(name = "nav-tui", version, about)]
struct Args {
    /// Base URL of the campus-nav HTTP API
    #[arg(long, default_value = "http://localhost:8080")]
    url: String,

    /// View polling interval in milliseconds
    #[arg(long, default_value_t = 500)]
    refresh_ms: u64,
}

/// Screen state shared between the poller and the UI
#[derive(Debug, Default)]
struct ScreenState {
    view: Option<MapView>,
    connected: bool,
    last_update: Option<Instant>,
    cursor: usize,
    search_input: Option<String>,
    last_error: Option<String>,
}

type SharedState = Arc<Mutex<ScreenState>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let base = args.url.trim_end_matches('/').to_string();
    let client = reqwest::Client::builder().timeout(Duration::from_secs(5)).build()?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let state: SharedState = Arc::new(Mutex::new(ScreenState::default()));

    let poll_state = state.clone();
    let poll_client = client.clone();
    let poll_base = base.clone();
    let refresh = Duration::from_millis(args.refresh_ms.max(50));
    let poll_handle = tokio::spawn(async move {
        run_view_poller(poll_client, poll_base, refresh, poll_state).await;
    });

    let result = run_ui(&mut terminal, state, client, base).await;

    poll_handle.abort();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

async fn run_view_poller(client: reqwest::Client, base: String, refresh: Duration, state: SharedState) {
    let mut interval = tokio::time::interval(refresh);
    loop {
        interval.tick().await;
        let result = async {
            client.get(format!("{base}/api/view")).send().await?.error_for_status()?.json::<MapView>().await
        }
        .await;

        let mut s = state.lock().await;
        match result {
            Ok(view) => {
                let len = view.quick_navigation.len();
                if len > 0 && s.cursor >= len {
                    s.cursor = len - 1;
                }
                s.view = Some(view);
                s.connected = true;
                s.last_update = Some(Instant::now());
            }
            Err(e) => {
                s.connected = false;
                s.last_error = Some(e.to_string());
            }
        }
    }
}

/// Fire a control request without blocking the UI
fn post(client: &reqwest::Client, base: &str, path: &str, query: &[(&str, String)], state: &SharedState) {
    let url = format!("{base}{path}");
    let request = client.post(&url).query(query);
    let state = state.clone();
    tokio::spawn(async move {
        let outcome = match request.send().await {
            Ok(resp) if resp.status().is_success() => None,
            Ok(resp) => Some(format!("{} -> HTTP {}", url, resp.status().as_u16())),
            Err(e) => Some(e.to_string()),
        };
        state.lock().await.last_error = outcome;
    });
}

fn next_style(current: BasemapStyle) -> BasemapStyle {
    let all = BasemapStyle::ALL;
    let i = all.iter().position(|s| *s == current).unwrap_or(0);
    all[(i + 1) % all.len()]
}

async fn run_ui(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    state: SharedState,
    client: reqwest::Client,
    base: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    loop {
        let s = state.lock().await;
        terminal.draw(|f| draw_ui(f, &s))?;
        drop(s);

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handle_key(key.code, &state, &client, &base).await {
                    return Ok(());
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }
}

/// Returns true when the user asked to quit
async fn handle_key(code: KeyCode, state: &SharedState, client: &reqwest::Client, base: &str) -> bool {
    let mut s = state.lock().await;

    // Search editing mode
    if let Some(input) = s.search_input.as_mut() {
        match code {
            KeyCode::Esc | KeyCode::Enter => s.search_input = None,
            KeyCode::Backspace => {
                input.pop();
                post(client, base, "/api/search", &[("search", input.clone())], state);
            }
            KeyCode::Char(c) => {
                input.push(c);
                post(client, base, "/api/search", &[("search", input.clone())], state);
            }
            _ => {}
        }
        return false;
    }

    match code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Up => s.cursor = s.cursor.saturating_sub(1),
        KeyCode::Down => {
            let len = s.view.as_ref().map(|v| v.quick_navigation.len()).unwrap_or(0);
            if s.cursor + 1 < len {
                s.cursor += 1;
            }
        }
        KeyCode::Enter => {
            let id = s.view.as_ref().and_then(|v| v.quick_navigation.get(s.cursor)).map(|b| b.id);
            if let Some(id) = id {
                post(client, base, "/api/select", &[("id", id.to_string())], state);
            }
        }
        KeyCode::Char('h') => {
            let id = s.view.as_ref().and_then(|v| v.quick_navigation.get(s.cursor)).map(|b| b.id);
            if let Some(id) = id {
                post(client, base, "/api/hover", &[("id", id.to_string())], state);
            }
        }
        KeyCode::Char('/') => {
            s.search_input = Some(s.view.as_ref().map(|v| v.search.clone()).unwrap_or_default());
        }
        KeyCode::Char('c') => post(client, base, "/api/clear", &[], state),
        KeyCode::Char('r') => post(client, base, "/api/recenter", &[], state),
        KeyCode::Char('s') => {
            let current = s.view.as_ref().map(|v| v.style.name).unwrap_or_default();
            post(client, base, "/api/style", &[("name", next_style(current).to_string())], state);
        }
        KeyCode::Char('+') | KeyCode::Char('-') => {
            let zoom = s.view.as_ref().map(|v| v.camera.zoom).unwrap_or(17.0);
            let level = if code == KeyCode::Char('+') { zoom + 1.0 } else { zoom - 1.0 };
            post(client, base, "/api/zoom", &[("level", level.to_string())], state);
        }
        _ => {}
    }
    false
}

fn draw_ui(f: &mut Frame, state: &ScreenState) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Instruction banner
            Constraint::Min(0),    // Panels
            Constraint::Length(3), // Footer
        ])
        .split(f.area());

    draw_header(f, main_chunks[0], state);
    draw_banner(f, main_chunks[1], state);

    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(main_chunks[2]);

    draw_buildings_panel(f, panels[0], state);
    draw_route_panel(f, panels[1], state);
    draw_footer(f, main_chunks[3], state);
}

fn draw_header(f: &mut Frame, area: Rect, state: &ScreenState) {
    let (status_text, status_color) = match (state.connected, state.view.as_ref().map(|v| v.status)) {
        (false, _) | (true, None) => ("DISCONNECTED", Color::Red),
        (true, Some(ViewStatus::Loading)) => ("LOCATING", Color::Yellow),
        (true, Some(ViewStatus::Error)) => ("ERROR", Color::Red),
        (true, Some(ViewStatus::Ready)) => ("READY", Color::Green),
    };

    let last = state
        .last_update
        .map(|t| format!("{}s ago", t.elapsed().as_secs()))
        .unwrap_or_else(|| "never".to_string());

    let mut spans = vec![
        Span::styled("Campus Nav ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw("| "),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw(" | Updated: "),
        Span::raw(last),
    ];
    if let Some(view) = &state.view {
        spans.push(Span::raw(" | Style: "));
        spans.push(Span::styled(view.style.name.to_string(), Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(format!(
            " | Camera: {} z{:.0}{}",
            view.camera.center,
            view.camera.zoom,
            if view.camera.following { "" } else { " (panned)" }
        )));
    }

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn draw_banner(f: &mut Frame, area: Rect, state: &ScreenState) {
    let view = state.view.as_ref();
    let line = match view.and_then(|v| v.error.as_ref()) {
        Some(banner) => Line::from(Span::styled(
            banner.message.clone(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        None => match view.and_then(|v| v.instruction.as_ref()) {
            Some(text) => Line::from(Span::styled(
                text.clone(),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )),
            None => Line::from(Span::styled("-", Style::default().fg(Color::DarkGray))),
        },
    };

    let banner = Paragraph::new(line)
        .block(Block::default().title(" Instruction ").borders(Borders::ALL));
    f.render_widget(banner, area);
}

fn draw_buildings_panel(f: &mut Frame, area: Rect, state: &ScreenState) {
    let Some(view) = &state.view else {
        f.render_widget(Block::default().title(" Buildings ").borders(Borders::ALL), area);
        return;
    };

    let selected = view.selected_popup.as_ref().map(|p| p.id);
    let hovered = view.hover_popup.as_ref().map(|p| p.id);
    let items: Vec<ListItem> = view
        .quick_navigation
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let marker = if Some(b.id) == selected { "▶ " } else { "  " };
            let mut style = Style::default();
            if i == state.cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            if Some(b.id) == selected {
                style = style.fg(Color::Green);
            } else if Some(b.id) == hovered {
                style = style.fg(Color::Yellow);
            }
            ListItem::new(Line::from(Span::styled(format!("{marker}{}", b.name), style)))
        })
        .collect();

    let title = match (&state.search_input, view.search.is_empty()) {
        (Some(input), _) => format!(" Search: {input}_ "),
        (None, true) => " Quick Navigation ".to_string(),
        (None, false) => format!(" Results for '{}' ", view.search),
    };
    let list = List::new(items).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );
    f.render_widget(list, area);
}

fn draw_route_panel(f: &mut Frame, area: Rect, state: &ScreenState) {
    let block = Block::default()
        .title(" Route ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let Some(popup) = state.view.as_ref().and_then(|v| v.selected_popup.as_ref()) else {
        let hint = Paragraph::new("No destination. Select a building and press Enter.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(hint, area);
        return;
    };

    let current = state.view.as_ref().and_then(|v| v.current_step);
    let mut lines = vec![Line::from(vec![
        Span::styled(popup.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(match popup.travel_time_minutes {
            Some(m) => format!("  ~{m} min"),
            None => "  routing...".to_string(),
        }),
    ])];
    for (i, step) in popup.steps.iter().enumerate() {
        let style = match current {
            Some(c) if c == i => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            Some(c) if i < c => Style::default().fg(Color::DarkGray),
            _ => Style::default(),
        };
        lines.push(Line::from(Span::styled(format!("{:>2}. {step}", i + 1), style)));
    }

    let route = Paragraph::new(lines).wrap(Wrap { trim: true }).block(block);
    f.render_widget(route, area);
}

fn draw_footer(f: &mut Frame, area: Rect, state: &ScreenState) {
    let you = state
        .view
        .as_ref()
        .and_then(|v| v.user_marker.as_ref())
        .map(|m| format!("{}: {} at {}", m.popup, m.coordinate, m.last_updated.format("%H:%M:%S")))
        .unwrap_or_else(|| "Waiting for location...".to_string());
    let error = state.last_error.as_deref().unwrap_or("");

    let footer = Paragraph::new(Line::from(vec![
        Span::raw(you),
        Span::raw("  "),
        Span::styled(error.to_string(), Style::default().fg(Color::Red)),
        Span::styled(
            "  [/]search [enter]go [h]over [c]lear [s]tyle [r]ecenter [+/-]zoom [q]uit",
            Style::default().fg(Color::DarkGray),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}
