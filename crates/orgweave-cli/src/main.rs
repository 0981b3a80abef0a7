use std::env;
use std::io::{Stdout, stdout};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use orgweave_config::Config;
use orgweave_engine::{Document, Granularity, NodeData, NodeId, Tree, io};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};

type Tui = Terminal<CrosstermBackend<Stdout>>;

struct App {
    files: Vec<PathBuf>,
    file_list_state: ListState,
    outline: Vec<String>,
    status: String,
    quit: bool,
}

impl App {
    fn new(notes_path: &PathBuf) -> Result<Self> {
        let files = io::scan_org_files(notes_path)?;
        let mut app = Self {
            files,
            file_list_state: ListState::default(),
            outline: Vec::new(),
            status: String::new(),
            quit: false,
        };
        if !app.files.is_empty() {
            app.file_list_state.select(Some(0));
            app.load_selection();
        }
        Ok(app)
    }

    fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit = true,
            KeyCode::Down | KeyCode::Char('j') => self.step(1),
            KeyCode::Up | KeyCode::Char('k') => self.step(-1),
            KeyCode::Char('r') => self.load_selection(),
            _ => {}
        }
    }

    /// Move the selection by `delta`, wrapping at both ends.
    fn step(&mut self, delta: isize) {
        if self.files.is_empty() {
            return;
        }
        let len = self.files.len() as isize;
        let current = self.file_list_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.file_list_state.select(Some(next));
        self.load_selection();
    }

    fn load_selection(&mut self) {
        let Some(index) = self.file_list_state.selected() else { return };
        let Some(path) = self.files.get(index) else { return };
        match io::read_file(path) {
            Ok(content) => {
                let doc = Document::from_str(&content);
                let tree = doc.parse(Granularity::Object);
                self.outline = render_outline(&tree);
                let stable = doc.render() == content;
                self.status = format!(
                    "{} — {} lines{}",
                    path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
                    content.lines().count(),
                    if stable { "" } else { " (non-canonical formatting)" },
                );
            }
            Err(e) => {
                self.outline = vec![format!("Error reading file: {e}")];
                self.status = String::new();
            }
        }
    }
}

/// Flatten the document's headlines into indented outline rows.
fn render_outline(tree: &Tree) -> Vec<String> {
    let mut rows = Vec::new();
    collect_headlines(tree, tree.root(), &mut rows);
    if rows.is_empty() {
        rows.push("(no headlines)".to_owned());
    }
    rows
}

fn collect_headlines(tree: &Tree, id: NodeId, rows: &mut Vec<String>) {
    for child in &tree[id].children {
        if let NodeData::Headline(h) = &tree[*child].data {
            let indent = "  ".repeat(h.level.saturating_sub(1));
            let todo = h
                .todo_keyword
                .as_deref()
                .map(|k| format!("{k} "))
                .unwrap_or_default();
            let tags = if h.tags.is_empty() {
                String::new()
            } else {
                format!("  :{}:", h.tags.join(":"))
            };
            rows.push(format!("{indent}{todo}{}{tags}", h.raw_value));
        }
        collect_headlines(tree, *child, rows);
    }
}

/// The notes directory: first CLI argument if given, otherwise the
/// configured `notes_path`.
fn resolve_notes_dir() -> Result<PathBuf> {
    let mut args = env::args().skip(1);
    let path = match (args.next(), args.next()) {
        (Some(arg), None) => PathBuf::from(arg),
        (None, None) => {
            let config = Config::load()
                .with_context(|| format!("reading {}", Config::config_path().display()))?;
            match config {
                Some(c) => c.notes_path,
                None => bail!(
                    "no notes directory given and no config at {}\n\
                     usage: orgweave [notes-dir]",
                    Config::config_path().display(),
                ),
            }
        }
        _ => bail!("usage: orgweave [notes-dir]"),
    };
    io::validate_notes_dir(&path)
        .with_context(|| format!("notes directory {}", path.display()))?;
    Ok(path)
}

fn terminal_enter() -> Result<Tui> {
    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout()))?)
}

fn terminal_leave(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn event_loop(terminal: &mut Tui, app: &mut App) -> Result<()> {
    while !app.quit {
        terminal.draw(|f| ui(f, app))?;
        if let Event::Key(key) = event::read()?
            && key.kind != KeyEventKind::Release
        {
            app.handle_key(key.code);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let notes_path = resolve_notes_dir()?;
    let mut app = App::new(&notes_path)?;

    let mut terminal = terminal_enter()?;
    let outcome = event_loop(&mut terminal, &mut app);
    terminal_leave(&mut terminal)?;
    outcome
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(2)].as_ref())
        .split(f.area());

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)].as_ref())
        .split(chunks[0]);

    let file_items: Vec<ListItem> = app
        .files
        .iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            ListItem::new(name)
        })
        .collect();

    let files_list = List::new(file_items)
        .block(Block::default().borders(Borders::ALL).title("Files"))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));
    f.render_stateful_widget(files_list, panes[0], &mut app.file_list_state);

    let outline_text: Vec<Line> = if app.outline.is_empty() {
        vec![Line::from("Select a file to view its outline")]
    } else {
        app.outline.iter().map(|row| Line::from(row.as_str())).collect()
    };
    let outline = Paragraph::new(outline_text)
        .block(Block::default().borders(Borders::ALL).title("Outline"));
    f.render_widget(outline, panes[1]);

    let help = Paragraph::new(vec![
        Line::from(app.status.as_str()),
        Line::from("q quit · j/k move · r reload"),
    ]);
    f.render_widget(help, chunks[1]);
}
