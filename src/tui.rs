#![cfg(feature = "tui")]

use crate::error::TurnError;
use crate::provider::{ChatResult, ClientFactory, ProviderKind};
use crate::session::{self, ChatSession, Role, Turn};
use anyhow::Context;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Terminal;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;

const HELP: &str =
    "Enter sends. F2 provider, F3 model. /provider <id> /model <name> /temp <0-2> /timeout <10-300> /clear /logout /quit";

/// Everything the event loop mutates between renders.
#[derive(Debug)]
struct UiState {
    session: ChatSession,
    input: String,
    status: String,
}

impl UiState {
    fn new(session: ChatSession) -> Self {
        let status = if session.is_logged_in() {
            HELP.to_string()
        } else {
            "Type a username and press Enter to log in.".to_string()
        };
        Self {
            session,
            input: String::new(),
            status,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Quit,
    Clear,
    Logout,
    Login(String),
    Provider(String),
    Model(String),
    Temperature(String),
    Timeout(String),
    Help,
    Unknown(String),
}

/// Parse a `/command`. Returns `None` for plain chat text.
fn parse_command(line: &str) -> Option<Command> {
    let rest = line.strip_prefix('/')?;
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((n, a)) => (n, a.trim().to_string()),
        None => (rest, String::new()),
    };
    Some(match name {
        "quit" | "exit" => Command::Quit,
        "clear" => Command::Clear,
        "logout" => Command::Logout,
        "login" => Command::Login(arg),
        "provider" => Command::Provider(arg),
        "model" => Command::Model(arg),
        "temp" | "temperature" => Command::Temperature(arg),
        "timeout" => Command::Timeout(arg),
        "help" => Command::Help,
        other => Command::Unknown(other.to_string()),
    })
}

pub async fn run_tui(chat: ChatSession, factory: Arc<dyn ClientFactory>) -> anyhow::Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("enter alt screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let (ev_tx, mut ev_rx) = mpsc::unbounded_channel::<Event>();
    std::thread::spawn(move || {
        while let Ok(ev) = crossterm::event::read() {
            if ev_tx.send(ev).is_err() {
                break;
            }
        }
    });

    let (turn_tx, mut turn_rx) = mpsc::unbounded_channel::<(Turn, Result<ChatResult, TurnError>)>();

    let mut ui = UiState::new(chat);
    let mut ticker = tokio::time::interval(std::time::Duration::from_millis(33));

    let res = loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = terminal.draw(|f| draw(f, &ui)) {
                    break Err(anyhow::Error::new(e).context("draw frame"));
                }
            }
            Some(ev) = ev_rx.recv() => {
                if let Event::Key(key) = ev {
                    if handle_key(key, &mut ui) {
                        break Ok(());
                    }
                }
            }
            Some((turn, outcome)) = turn_rx.recv() => {
                ui.session.finish_turn(&turn, outcome);
            }
        }

        // Next processing step: pick up a freshly submitted message.
        if let Some(turn) = ui.session.begin_turn() {
            let factory = factory.clone();
            let tx = turn_tx.clone();
            tokio::spawn(async move {
                let outcome = session::run_turn(factory.as_ref(), &turn).await;
                let _ = tx.send((turn, outcome));
            });
        }
    };

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    res
}

/// Apply one key press. Returns true when the UI should exit.
fn handle_key(key: KeyEvent, ui: &mut UiState) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Char(c) => ui.input.push(c),
        KeyCode::Backspace => {
            ui.input.pop();
        }
        KeyCode::F(2) => {
            ui.session.controls.cycle_provider();
            ui.status = format!("provider: {}", ui.session.controls.provider());
        }
        KeyCode::F(3) => {
            ui.session.controls.cycle_model();
            ui.status = format!("model: {}", ui.session.controls.model());
        }
        KeyCode::Enter => {
            let line = ui.input.trim().to_string();
            ui.input.clear();
            if line.is_empty() {
                return false;
            }
            return handle_line(&line, ui);
        }
        _ => {}
    }

    false
}

fn handle_line(line: &str, ui: &mut UiState) -> bool {
    let Some(cmd) = parse_command(line) else {
        let res = if ui.session.is_logged_in() {
            ui.session.submit(line)
        } else {
            ui.session.login(line)
        };
        ui.status = match res {
            Ok(()) if ui.session.is_pending() => "waiting for response...".to_string(),
            Ok(()) => HELP.to_string(),
            Err(e) => e.to_string(),
        };
        return false;
    };

    ui.status = match cmd {
        Command::Quit => return true,
        Command::Clear => {
            ui.session.clear();
            "history cleared".to_string()
        }
        Command::Logout => {
            ui.session.logout();
            "logged out. Type a username and press Enter to log in.".to_string()
        }
        Command::Login(name) => match ui.session.login(&name) {
            Ok(()) => HELP.to_string(),
            Err(e) => e.to_string(),
        },
        Command::Provider(id) => match id.parse::<ProviderKind>() {
            Ok(p) => {
                ui.session.controls.set_provider(p);
                format!("provider: {p}, model: {}", ui.session.controls.model())
            }
            Err(e) => format!("{e} (choose one of {})", ProviderKind::choices()),
        },
        Command::Model(name) if name.is_empty() => {
            format!("models for {}: {}", ui.session.controls.provider(), ui.session.controls.provider().models().join(", "))
        }
        Command::Model(name) => {
            ui.session.controls.set_model(name);
            format!("model: {}", ui.session.controls.model())
        }
        Command::Temperature(v) => match v.parse::<f32>() {
            Ok(t) => {
                ui.session.controls.set_temperature(t);
                format!("temperature: {:.1}", ui.session.controls.temperature())
            }
            Err(_) => format!("invalid temperature: {v:?}"),
        },
        Command::Timeout(v) => match v.parse::<u64>() {
            Ok(t) => {
                ui.session.controls.set_timeout_secs(t);
                format!("timeout: {}s", ui.session.controls.timeout_secs())
            }
            Err(_) => format!("invalid timeout: {v:?}"),
        },
        Command::Help => HELP.to_string(),
        Command::Unknown(name) => format!("unknown command: /{name}"),
    };
    false
}

fn draw(f: &mut ratatui::Frame, ui: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(f.area());

    let session = &ui.session;
    let controls = &session.controls;
    let user = session.username().unwrap_or("(not logged in)");
    let header = Paragraph::new(format!(
        "user: {user} | provider: {} | model: {} | temperature: {:.1} | timeout: {}s{}",
        controls.provider(),
        controls.model(),
        controls.temperature(),
        controls.timeout_secs(),
        if session.is_pending() { " | pending" } else { "" },
    ))
    .block(Block::default().borders(Borders::ALL).title("llm-switch"));

    let mut text = Text::default();
    for m in session.messages() {
        let (who, style) = match m.role {
            Role::User => (user.to_string(), Style::default().add_modifier(Modifier::BOLD)),
            Role::Assistant => (
                match &m.provider_label {
                    Some(label) => format!("{} ({label})", m.role.as_str()),
                    None => m.role.as_str().to_string(),
                },
                Style::default().add_modifier(Modifier::ITALIC),
            ),
        };
        text.lines.push(Line::styled(format!("{who}:"), style));
        text.lines.extend(Text::from(m.content.clone()).lines);
        text.lines.push(Line::from(""));
    }

    let chat = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("chat"))
        .wrap(Wrap { trim: false });

    let status = Paragraph::new(ui.status.as_str());

    let input_title = if session.is_logged_in() { "message" } else { "username" };
    let input_w = Paragraph::new(ui.input.as_str()).block(Block::default().borders(Borders::ALL).title(input_title));

    f.render_widget(header, chunks[0]);
    f.render_widget(chat, chunks[1]);
    f.render_widget(status, chunks[2]);
    f.render_widget(input_w, chunks[3]);

    let x = chunks[3].x + 1 + ui.input.chars().count() as u16;
    let y = chunks[3].y + 1;
    f.set_cursor_position((x.min(chunks[3].x + chunks[3].width.saturating_sub(2)), y));
}

/// Render one frame to an arbitrary backend.
#[cfg(test)]
fn render<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, ui: &UiState) -> anyhow::Result<()> {
    terminal.draw(|f| draw(f, ui)).map_err(|e| anyhow::anyhow!("draw frame: {e}"))?;
    Ok(())
}
