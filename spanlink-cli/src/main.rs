//! Spanlink CLI - Terminal-based span and relation annotation tool

mod config;
mod io;
mod ui;

use std::fs::{self, OpenOptions};
use std::io::{stdout, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use spanlink_core::{
    App, ArcStyle, Focus, InputTarget, Key, KeyInput, LayoutEngine, OverlapPolicy, Point,
    ProjectConfig, Prompt, SplitStrategy,
};

use crate::config::{default_config_dir, Settings, CONFIG_FILE};
use crate::io::JsonFileStore;
use crate::ui::View;

/// Pointer hit distance in terminal cells
const HOVER_TOLERANCE: f32 = 0.75;

#[derive(Debug, Parser)]
#[command(name = "spanlink", version, about = "Annotate entity spans and the relations between them")]
struct Cli {
    /// Text files to import as documents
    files: Vec<PathBuf>,

    /// Project to open or create
    #[arg(short, long)]
    project: Option<String>,

    /// Entity labels, separated by `,` or `;`
    #[arg(long)]
    labels: Option<String>,

    /// Relation types, separated by `,` or `;`
    #[arg(long)]
    relation_types: Option<String>,

    /// How imported files are split: as_is, paragraph, sentence, length
    #[arg(long)]
    split: Option<SplitStrategy>,

    /// Chunk length for the `length` split
    #[arg(long)]
    length: Option<usize>,

    /// Refuse spans that overlap an existing span
    #[arg(long)]
    strict_overlap: bool,

    /// Settings file (defaults to ~/.spanlink/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(project) = &self.project {
            settings.project_name = project.clone();
        }
        if let Some(labels) = &self.labels {
            settings.labels = ProjectConfig::parse_vocabulary(labels);
        }
        if let Some(types) = &self.relation_types {
            settings.relation_types = ProjectConfig::parse_vocabulary(types);
        }
        if let Some(split) = self.split {
            settings.split = split.name().to_string();
        }
        if let Some(length) = self.length {
            settings.fixed_length = length;
        }
        if self.strict_overlap {
            settings.overlap = OverlapPolicy::Reject;
        }
    }

    /// True when the vocabulary was given on the command line and should
    /// override the one stored with the project
    fn overrides_vocabulary(&self) -> bool {
        self.labels.is_some() || self.relation_types.is_some() || self.strict_overlap
    }
}

/// Everything the event loop needs besides the app itself
struct Session {
    store: JsonFileStore,
    data_dir: PathBuf,
    split: SplitStrategy,
    view: View,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => default_config_dir()
            .context("Could not determine home directory")?
            .join(CONFIG_FILE),
    };
    let config_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let (mut settings, notice) = config::Settings::load(&config_path);
    cli.apply(&mut settings);

    let data_dir = io::ensure_dir(&settings.data_dir(&config_dir))?;
    let _log_guard = setup_logging(&data_dir);
    info!(project = %settings.project_name, data_dir = %data_dir.display(), "starting spanlink");

    let mut session = Session {
        store: JsonFileStore::new(&data_dir),
        data_dir,
        split: settings.split_strategy(),
        view: View::new(settings.line_height()),
    };

    let mut app = App::new(settings.project_config());
    app.layout = LayoutEngine::new(ArcStyle::terminal());
    app.hover_tolerance = HOVER_TOLERANCE;

    if session.store.has_project(&settings.project_name) {
        app.load_project(&mut session.store, &settings.project_name);
        if cli.overrides_vocabulary() {
            app.config = settings.project_config();
        }
    } else {
        app.project_id = settings.project_name.clone();
    }

    for path in &cli.files {
        match io::load_units(path, session.split) {
            Ok(units) => {
                let added = app.import_texts(units);
                info!(file = %path.display(), documents = added.len(), "imported");
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "import failed");
                app.set_status(&format!("Error: {e}"));
            }
        }
    }
    if let Some(notice) = notice {
        app.set_status(&notice);
    } else if app.navigator.is_empty() {
        app.set_status("No documents. Pass text files as arguments or press o to import.");
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, &mut session);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = res {
        eprintln!("Error: {}", e);
    }

    Ok(())
}

/// Log to `<data_dir>/logs/spanlink.log`. The terminal belongs to the UI,
/// so there is no stdout layer.
fn setup_logging(data_dir: &Path) -> Option<WorkerGuard> {
    let logs_dir = data_dir.join("logs");
    if fs::create_dir_all(&logs_dir).is_err() {
        return None;
    }

    let log_path = logs_dir.join("spanlink.log");
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&log_path) {
        let _ = writeln!(
            file,
            "\n========== Session started {} ==========",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );
    }

    let file_appender = tracing_appender::rolling::never(&logs_dir, "spanlink.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_level(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,spanlink=debug,spanlink_core=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();

    Some(guard)
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    session: &mut Session,
) -> Result<()> {
    while app.running {
        terminal.draw(|f| ui::draw(f, app, &mut session.view))?;

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, session, key),
            Event::Mouse(mouse) => handle_mouse(app, &session.view, mouse),
            _ => {}
        }
    }
    Ok(())
}

fn key_input(key: &KeyEvent) -> KeyInput {
    let k = match key.code {
        KeyCode::Char(' ') => Key::Space,
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Tab => Key::Tab,
        KeyCode::BackTab => Key::BackTab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Esc => Key::Escape,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        _ => Key::Other,
    };
    KeyInput {
        key: k,
        ctrl: key.modifiers.contains(KeyModifiers::CONTROL),
        meta: key.modifiers.contains(KeyModifiers::SUPER),
        in_editable: false,
    }
}

fn handle_key(app: &mut App, session: &mut Session, key: KeyEvent) {
    app.clear_status();

    if app.show_help {
        app.show_help = false;
        return;
    }
    if app.prompt.is_some() {
        handle_prompt(app, session, key.code);
        return;
    }
    if app.handle_key(key_input(&key)) {
        return;
    }

    match app.focus {
        Focus::Editor => handle_editor_key(app, session, key.code),
        Focus::Documents => handle_documents_key(app, session, key.code),
    }
}

fn open_prompt(app: &mut App, target: InputTarget) {
    app.prompt = Some(Prompt {
        target,
        buffer: String::new(),
    });
}

fn save(app: &mut App, session: &mut Session) {
    if app.save_project(&mut session.store) {
        app.set_status(&format!("Saved project {}", app.project_id));
    }
}

fn export(app: &mut App, session: &Session) {
    let written = app
        .export(app.export_format)
        .and_then(|(name, content)| {
            io::write_export(&session.data_dir, &name, &content)
                .map_err(|e| spanlink_core::Error::Storage(e.to_string()))
        });
    match written {
        Ok(path) => app.set_status(&format!("Exported {}", path.display())),
        Err(e) => app.set_status(&format!("Export failed: {e}")),
    }
}

fn handle_editor_key(app: &mut App, session: &mut Session, code: KeyCode) {
    match code {
        KeyCode::Char('q') => {
            save(app, session);
            app.running = false;
        }
        KeyCode::Char('?') => app.show_help = true,

        // Caret
        KeyCode::Char('h') => app.move_left(),
        KeyCode::Char('l') => app.move_right(),
        KeyCode::Char('j') | KeyCode::Down => app.move_down(),
        KeyCode::Char('k') | KeyCode::Up => app.move_up(),
        KeyCode::Char('w') => app.move_word_forward(),
        KeyCode::Char('b') => app.move_word_back(),
        KeyCode::Char('g') => app.move_to_top(),
        KeyCode::Char('G') => app.move_to_bottom(),

        // Selection
        KeyCode::Char('v') => app.toggle_visual(),
        KeyCode::Char('a') => {
            if !app.annotate_visual() {
                app.set_status("Nothing selected. Press v to start a selection.");
            }
        }
        KeyCode::Tab => app.cycle_selected_span(true),
        KeyCode::BackTab => app.cycle_selected_span(false),
        KeyCode::Enter => app.click_selected_span(),

        // Ctrl+digit rarely reaches a terminal, so plain digits pick the
        // relation type while the relation picker is open
        KeyCode::Char(c @ '1'..='9') if app.mode().pending_relation().is_some() => {
            let index = c as usize - '1' as usize;
            app.choose_relation_type_index(index);
        }

        KeyCode::Char('u') => {
            if !app.undo() {
                app.set_status("Nothing to undo");
            }
        }
        KeyCode::Char('X') => {
            app.clear_annotations();
        }

        // Documents
        KeyCode::Char('c') => {
            if app.mark_completed() {
                app.save_record(&mut session.store);
                app.next_document();
            }
        }
        KeyCode::Char('r') => {
            app.reopen_document();
        }
        KeyCode::Char('s') => save(app, session),
        KeyCode::Char('e') => export(app, session),
        KeyCode::Char('E') => {
            app.export_format = app.export_format.next();
            app.set_status(&format!("Export format: {}", app.export_format.extension()));
        }
        KeyCode::Char('o') => open_prompt(app, InputTarget::ImportPath),
        KeyCode::Char('/') => open_prompt(app, InputTarget::Search),
        KeyCode::Char('f') => app.focus = Focus::Documents,
        _ => {}
    }
}

fn handle_documents_key(app: &mut App, session: &mut Session, code: KeyCode) {
    let count = app.navigator.len();
    match code {
        KeyCode::Char('q') => {
            save(app, session);
            app.running = false;
        }
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Char('j') | KeyCode::Down => {
            if app.list_selected + 1 < count {
                app.list_selected += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.list_selected = app.list_selected.saturating_sub(1);
        }
        KeyCode::Enter => {
            if app.goto_document(app.list_selected) {
                app.focus = Focus::Editor;
            }
        }
        KeyCode::Char('x') => {
            app.navigator.toggle_export_selection(app.list_selected);
        }
        KeyCode::Char('D') => {
            if app.remove_document(app.list_selected) {
                app.list_selected = app.list_selected.min(app.navigator.len().saturating_sub(1));
            }
        }
        KeyCode::Char('e') => export(app, session),
        KeyCode::Char('/') => open_prompt(app, InputTarget::Search),
        KeyCode::Char('f') | KeyCode::Esc => app.focus = Focus::Editor,
        _ => {}
    }
}

fn handle_prompt(app: &mut App, session: &mut Session, code: KeyCode) {
    match code {
        KeyCode::Esc => app.prompt = None,
        KeyCode::Enter => {
            let Some(prompt) = app.prompt.take() else {
                return;
            };
            let input = prompt.buffer.trim();
            if input.is_empty() {
                return;
            }
            match prompt.target {
                InputTarget::ImportPath => match io::load_units(Path::new(input), session.split) {
                    Ok(units) => {
                        let added = app.import_texts(units);
                        app.set_status(&format!("Imported {} documents", added.len()));
                    }
                    Err(e) => app.set_status(&format!("Error: {e}")),
                },
                InputTarget::Search => {
                    let hits = app.search(input);
                    app.set_status(&format!("{hits} documents match '{input}'"));
                }
            }
        }
        KeyCode::Backspace => {
            if let Some(prompt) = app.prompt.as_mut() {
                prompt.buffer.pop();
            }
        }
        KeyCode::Char(c) => {
            if let Some(prompt) = app.prompt.as_mut() {
                prompt.buffer.push(c);
            }
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, view: &View, mouse: MouseEvent) {
    if app.prompt.is_some() || app.show_help {
        return;
    }
    let point = view.to_layout(mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if let Some(p) = point {
                app.focus = Focus::Editor;
                app.pointer_down(p);
            }
        }
        MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => {
            if let Some(p) = point {
                app.pointer_moved(p);
            }
        }
        // Releasing outside the editor ends any gesture without a target
        MouseEventKind::Up(MouseButton::Left) => {
            app.pointer_up(point.unwrap_or(Point::new(-1.0, -1.0)));
        }
        MouseEventKind::Down(MouseButton::Right) => {
            if let Some(p) = point {
                app.context_click(p);
            }
        }
        MouseEventKind::ScrollDown => app.move_down(),
        MouseEventKind::ScrollUp => app.move_up(),
        _ => {}
    }
}
