//! Spanlink Web - WebAssembly version of the annotation tool
//!
//! This crate provides a browser-based version of Spanlink using Ratzilla
//! for terminal rendering in the DOM. Projects persist in `localStorage`.

use std::cell::RefCell;
use std::rc::Rc;

use ratzilla::event::{KeyCode, KeyEvent};
use ratzilla::ratatui::Terminal;
use ratzilla::{DomBackend, WebRenderer};
use wasm_bindgen::prelude::*;

use spanlink_core::{
    split_text, App, ArcStyle, ExportFormat, InputTarget, Key, KeyInput, LayoutEngine, Prompt,
    SplitStrategy,
};

pub mod io;
mod ui;

use crate::io::LocalStorageStore;

const PROJECT_ID: &str = "demo";

/// Sample documents for the demo project
const SAMPLE_CONTENT: &str = "Mike lives in America. \
Ada Lovelace worked with Charles Babbage in London. \
Marie Curie was born in Warsaw and moved to Paris. \
Alan Turing studied at Cambridge.";

/// Initialize the Spanlink web application
#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let mut app = App::default();
    app.layout = LayoutEngine::new(ArcStyle::terminal());

    let mut store = LocalStorageStore;
    if !app.load_project(&mut store, PROJECT_ID) {
        app.project_id = PROJECT_ID.to_string();
        app.import_texts(split_text(SAMPLE_CONTENT, SplitStrategy::Sentence));
    }
    app.set_status("Welcome to Spanlink! Press 'v' to start selecting, '?' for help");

    let app_state = Rc::new(RefCell::new(app));

    let backend = DomBackend::new()
        .map_err(|e| JsValue::from_str(&format!("Failed to create backend: {:?}", e)))?;
    let mut terminal = Terminal::new(backend)
        .map_err(|e| JsValue::from_str(&format!("Failed to create terminal: {:?}", e)))?;

    terminal.on_key_event({
        let app_state_cloned = app_state.clone();
        move |event| {
            let mut app = app_state_cloned.borrow_mut();
            handle_key(&mut app, &event);
        }
    });

    let view = RefCell::new(ui::View::default());
    terminal.draw_web(move |frame| {
        let mut app = app_state.borrow_mut();
        ui::draw(frame, &mut app, &mut view.borrow_mut());
    });

    web_sys::console::log_1(&"Spanlink WASM initialized".into());

    Ok(())
}

fn key_input(event: &KeyEvent) -> KeyInput {
    let key = match event.code {
        KeyCode::Char(' ') => Key::Space,
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Tab if event.shift => Key::BackTab,
        KeyCode::Tab => Key::Tab,
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
        key,
        ctrl: event.ctrl,
        meta: false,
        in_editable: false,
    }
}

fn handle_key(app: &mut App, event: &KeyEvent) {
    app.clear_status();

    if app.show_help {
        app.show_help = false;
        return;
    }
    if app.prompt.is_some() {
        handle_prompt(app, &event.code);
        return;
    }
    if app.handle_key(key_input(event)) {
        return;
    }

    match event.code {
        KeyCode::Char('?') => app.show_help = true,

        KeyCode::Char('h') => app.move_left(),
        KeyCode::Char('l') => app.move_right(),
        KeyCode::Char('j') | KeyCode::Down => app.move_down(),
        KeyCode::Char('k') | KeyCode::Up => app.move_up(),
        KeyCode::Char('w') => app.move_word_forward(),
        KeyCode::Char('b') => app.move_word_back(),
        KeyCode::Char('g') => app.move_to_top(),
        KeyCode::Char('G') => app.move_to_bottom(),

        KeyCode::Char('v') => app.toggle_visual(),
        KeyCode::Char('a') => {
            if !app.annotate_visual() {
                app.set_status("Nothing selected. Press v to start a selection.");
            }
        }
        KeyCode::Tab => app.cycle_selected_span(!event.shift),
        KeyCode::Enter => app.click_selected_span(),

        // Browsers keep Ctrl+digit for tab switching
        KeyCode::Char(c @ '1'..='9') if app.mode().pending_relation().is_some() => {
            app.choose_relation_type_index(c as usize - '1' as usize);
        }

        KeyCode::Char('u') => {
            if !app.undo() {
                app.set_status("Nothing to undo");
            }
        }
        KeyCode::Char('X') => {
            app.clear_annotations();
        }
        KeyCode::Char('c') => {
            if app.mark_completed() {
                app.save_record(&mut LocalStorageStore);
                app.next_document();
            }
        }
        KeyCode::Char('r') => {
            app.reopen_document();
        }
        KeyCode::Char('s') => {
            if app.save_project(&mut LocalStorageStore) {
                app.set_status("Saved to browser storage");
            }
        }
        KeyCode::Char('e') => export(app),
        KeyCode::Char('E') => {
            app.export_format = app.export_format.next();
            app.set_status(&format!("Export format: {}", app.export_format.extension()));
        }
        KeyCode::Char('o') => open_prompt(app, InputTarget::ImportPath),
        KeyCode::Char('/') => open_prompt(app, InputTarget::Search),
        _ => {}
    }
}

fn open_prompt(app: &mut App, target: InputTarget) {
    app.prompt = Some(Prompt {
        target,
        buffer: String::new(),
    });
}

fn mime_type(format: ExportFormat) -> &'static str {
    match format {
        ExportFormat::Jsonl => "application/x-ndjson",
        ExportFormat::Tsv => "text/tab-separated-values",
        ExportFormat::Csv => "text/csv",
        ExportFormat::Json => "application/json",
    }
}

fn export(app: &mut App) {
    let format = app.export_format;
    match app.export(format) {
        Ok((name, content)) => match io::download(&name, &content, mime_type(format)) {
            Ok(()) => app.set_status(&format!("Exported to {}", name)),
            Err(e) => app.set_status(&format!("Export failed: {:?}", e)),
        },
        Err(e) => app.set_status(&format!("Serialization failed: {}", e)),
    }
}

/// In the browser the import prompt takes pasted text rather than a path
fn handle_prompt(app: &mut App, code: &KeyCode) {
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
                InputTarget::ImportPath => {
                    let added = app.import_texts(split_text(input, SplitStrategy::Sentence));
                    app.set_status(&format!("Imported {} documents", added.len()));
                }
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
                prompt.buffer.push(*c);
            }
        }
        _ => {}
    }
}
