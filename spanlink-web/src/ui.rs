//! Terminal UI rendering for Spanlink Web
//!
//! This module mirrors spanlink-cli's UI but uses ratzilla's rendering.

use ratzilla::ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

use spanlink_core::layout::RelationArc;
use spanlink_core::{App, ContainerId, GridMeasurer, InputTarget, Mode, SpanId};

// Catppuccin Mocha colors
const SURFACE0: Color = Color::Rgb(49, 50, 68);
const SURFACE1: Color = Color::Rgb(69, 71, 90);
const OVERLAY0: Color = Color::Rgb(108, 112, 134);
const TEXT: Color = Color::Rgb(205, 214, 244);
const SUBTEXT0: Color = Color::Rgb(166, 173, 200);
const RED: Color = Color::Rgb(243, 139, 168);
const PEACH: Color = Color::Rgb(250, 179, 135);
const YELLOW: Color = Color::Rgb(249, 226, 175);
const GREEN: Color = Color::Rgb(166, 227, 161);
const TEAL: Color = Color::Rgb(148, 226, 213);
const BLUE: Color = Color::Rgb(137, 180, 250);
const MAUVE: Color = Color::Rgb(203, 166, 247);

const LABEL_COLORS: [Color; 6] = [BLUE, GREEN, YELLOW, MAUVE, TEAL, RED];

const TEXT_CONTAINER: ContainerId = ContainerId(0);
const LINE_HEIGHT: u16 = 3;

/// Scroll state of the editor between frames
#[derive(Debug, Default)]
pub struct View {
    editor: Rect,
    scroll: u16,
}

impl View {
    fn to_screen(&self, x: f32, y: f32) -> Option<Position> {
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let (col, row) = (x as u16, y as u16);
        if row < self.scroll {
            return None;
        }
        let pos = Position::new(self.editor.x.saturating_add(col), self.editor.y + row - self.scroll);
        self.editor.contains(pos).then_some(pos)
    }
}

fn is_text_row(row: u16) -> bool {
    (row + 1) % LINE_HEIGHT == 0
}

pub fn draw(frame: &mut Frame, app: &mut App, view: &mut View) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title bar
            Constraint::Min(0),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    draw_title_bar(frame, app, chunks[0]);
    draw_main_area(frame, app, view, chunks[1]);
    draw_status_bar(frame, app, chunks[2]);

    // Draw popups/overlays
    match app.mode() {
        Mode::PendingLabelChoice(_) => draw_picker(frame, app, false),
        Mode::PendingRelationTypeChoice { .. } => draw_picker(frame, app, true),
        _ => {}
    }
    if app.prompt.is_some() {
        draw_input_dialog(frame, app);
    }
    if app.show_help {
        draw_help(frame);
    }
}

fn label_color(app: &App, label: &str) -> Color {
    app.config
        .label_index(label)
        .map(|i| LABEL_COLORS[i % LABEL_COLORS.len()])
        .unwrap_or(SUBTEXT0)
}

fn draw_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status = app
        .navigator
        .active_document()
        .map(|d| d.status.as_str())
        .unwrap_or("-");

    let title_text = format!(
        " spanlink - {} [{}] spans:{} relations:{}",
        app.title(),
        status,
        app.store.spans().len(),
        app.store.relations().len(),
    );

    let title_bar = Paragraph::new(title_text).style(Style::default().fg(TEXT).bg(SURFACE0));
    frame.render_widget(title_bar, area);
}

fn draw_main_area(frame: &mut Frame, app: &mut App, view: &mut View, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(0),     // Editor
            Constraint::Length(34), // Sidebar
        ])
        .split(area);

    draw_editor(frame, app, view, chunks[0]);
    draw_sidebar(frame, app, chunks[1]);
}

fn draw_editor(frame: &mut Frame, app: &mut App, view: &mut View, area: Rect) {
    let mode_indicator = match (app.visual_anchor, app.mode()) {
        (Some(_), _) => " [VISUAL]".to_string(),
        (None, Mode::Idle) => String::new(),
        (None, mode) => format!(" [{}]", mode.name()),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BLUE))
        .title(format!("Text{}", mode_indicator));

    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let mut grid = GridMeasurer::new(TEXT_CONTAINER, inner.width, LINE_HEIGHT);
    app.prepare_frame(&mut grid);

    view.editor = inner;
    let caret_row = app
        .layout
        .rects()
        .get(app.cursor.offset())
        .map(|r| r.y as u16)
        .unwrap_or(0);
    let top = grid.top_padding();
    if caret_row < view.scroll + top {
        view.scroll = caret_row.saturating_sub(top);
    } else if caret_row >= view.scroll + inner.height {
        view.scroll = caret_row + 1 - inner.height;
    }

    let buf = frame.buffer_mut();
    paint_text(buf, app, view);
    for (index, arc) in app.layout.geometry().arcs.iter().enumerate() {
        let (Some(arc), Some(relation)) = (arc, app.store.relations().get(index)) else {
            continue;
        };
        let color = if app.interaction.hovered_relation() == Some(index) {
            PEACH
        } else {
            OVERLAY0
        };
        paint_arc(buf, view, arc, &relation.relation_type, Style::default().fg(color));
    }
}

fn paint_text(buf: &mut Buffer, app: &App, view: &View) {
    let chars: Vec<char> = app.active_text().chars().collect();
    let selected = app.interaction.selected_span();
    let origin = app.mode().relation_origin();
    let highlight = app.selection_preview().or(app.mode().pending_range());
    let caret = app.cursor.offset();

    let mut owner: Vec<Option<(SpanId, &str)>> = vec![None; chars.len()];
    for span in app.store.spans() {
        for slot in owner.iter_mut().take(span.end).skip(span.start) {
            *slot = Some((span.id, span.label.as_str()));
        }
    }

    for (i, (ch, rect)) in chars.iter().zip(app.layout.rects()).enumerate() {
        if rect.w == 0.0 || ch.is_control() {
            continue;
        }
        let Some(pos) = view.to_screen(rect.x, rect.y) else {
            continue;
        };

        let mut style = Style::default().fg(TEXT);
        if let Some((id, label)) = owner[i] {
            style = style
                .fg(label_color(app, label))
                .add_modifier(Modifier::UNDERLINED);
            if Some(id) == selected || Some(id) == origin {
                style = style.bg(SURFACE1).add_modifier(Modifier::BOLD);
            }
        }
        if highlight.is_some_and(|r| r.contains(i)) {
            style = style.bg(SURFACE1).add_modifier(Modifier::BOLD);
        }
        if caret == i {
            style = style.add_modifier(Modifier::REVERSED);
        }

        if let Some(cell) = buf.cell_mut(pos) {
            cell.set_char(*ch).set_style(style);
        }
    }
}

fn paint_arc(buf: &mut Buffer, view: &View, arc: &RelationArc, label: &str, style: Style) {
    let lower = arc.p0.y.round();
    let upper = arc.peak.y.round();
    let upper_ok = upper >= 0.0 && upper < lower && !is_text_row(upper as u16);
    let bar_row = if upper_ok { upper } else { lower };

    let mut put = |x: f32, y: f32, ch: char| {
        if y < 0.0 || is_text_row(y as u16) {
            return;
        }
        if let Some(cell) = view.to_screen(x, y).and_then(|pos| buf.cell_mut(pos)) {
            cell.set_char(ch).set_style(style);
        }
    };

    let (left, right) = if arc.p0.x <= arc.p3.x {
        (arc.p0.x, arc.p3.x)
    } else {
        (arc.p3.x, arc.p0.x)
    };
    let mut x = left;
    while x <= right {
        put(x, bar_row, '─');
        x += 1.0;
    }
    if upper_ok {
        put(left, upper, '╭');
        put(right, upper, '╮');
        put(arc.p0.x, lower, '│');
    }
    put(arc.p3.x, lower, '▼');

    let width = label.chars().count() as f32;
    let start = (arc.label_at.x - width / 2.0).max(left + 1.0);
    for (k, ch) in label.chars().enumerate() {
        let x = start + k as f32;
        if x >= right {
            break;
        }
        put(x, bar_row, ch);
    }
}

fn draw_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let text = app.active_text();
    let selected = app.interaction.selected_span();
    let mut spans: Vec<_> = app.store.spans().iter().collect();
    spans.sort_by_key(|s| (s.start, s.end));
    let span_items: Vec<ListItem> = spans
        .into_iter()
        .map(|span| {
            let fragment: String = span.fragment(text).chars().take(16).collect();
            let mut style = Style::default().fg(label_color(app, &span.label));
            if Some(span.id) == selected {
                style = style.bg(SURFACE1);
            }
            ListItem::new(Line::from(vec![
                Span::styled(format!("#{} {} ", span.id, span.label), style),
                Span::styled(fragment.replace('\n', " "), Style::default().fg(SUBTEXT0)),
            ]))
        })
        .collect();
    let span_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(SUBTEXT0))
        .title(format!("Spans ({})", app.store.spans().len()));
    frame.render_widget(List::new(span_items).block(span_block), chunks[0]);

    let relation_items: Vec<ListItem> = app
        .store
        .relations()
        .iter()
        .map(|r| {
            ListItem::new(format!("#{} -{}-> #{}", r.from_id, r.relation_type, r.to_id))
                .style(Style::default().fg(TEXT))
        })
        .collect();
    let relation_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(SUBTEXT0))
        .title(format!("Relations ({})", app.store.relations().len()));
    frame.render_widget(List::new(relation_items).block(relation_block), chunks[1]);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status = app.status_message.as_deref().unwrap_or("");

    let help_hint = match app.mode() {
        Mode::PendingLabelChoice(_) => "1-9 label | Space first label | Esc cancel",
        Mode::PendingRelationTypeChoice { .. } => "1-9 type | Esc cancel",
        Mode::AwaitingSecondEndpoint(_) => "Tab+Enter the target span | Esc cancel",
        _ => "v select | a label | Tab span | Enter link | ←/→ doc | ? help",
    };

    let status_text = format!(
        " {} | {}",
        app.mode().name(),
        if status.is_empty() { help_hint } else { status },
    );

    let status_bar = Paragraph::new(status_text).style(Style::default().fg(SUBTEXT0).bg(SURFACE0));
    frame.render_widget(status_bar, area);
}

fn draw_picker(frame: &mut Frame, app: &App, relation: bool) {
    let (title, options, color) = if relation {
        ("Relation type", &app.config.relation_types, PEACH)
    } else {
        ("Label", &app.config.labels, MAUVE)
    };
    let area = centered_rect(36, options.len().min(9) as u16 + 2, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title);

    let items: Vec<ListItem> = options
        .iter()
        .take(9)
        .enumerate()
        .map(|(i, name)| {
            let style = if relation {
                Style::default().fg(TEAL)
            } else {
                Style::default().fg(label_color(app, name))
            };
            ListItem::new(format!("{} {}", i + 1, name)).style(style)
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn draw_input_dialog(frame: &mut Frame, app: &App) {
    let Some(prompt) = &app.prompt else {
        return;
    };
    let area = centered_rect(50, 3, frame.area());
    frame.render_widget(Clear, area);

    let title = match prompt.target {
        InputTarget::ImportPath => "Paste text",
        InputTarget::Search => "Search documents",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(GREEN))
        .title(title);

    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(
        Paragraph::new(format!("{}_", prompt.buffer)).style(Style::default().fg(TEXT)),
        inner,
    );
}

fn draw_help(frame: &mut Frame) {
    let area = centered_rect(58, 20, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BLUE))
        .title("Help (press any key to close)");

    let heading = |s: &'static str| {
        Line::from(Span::styled(s, Style::default().fg(MAUVE).add_modifier(Modifier::BOLD)))
    };

    let help_text = vec![
        heading("Text"),
        Line::from("  h/j/k/l  Move caret      w/b  Word forward/back"),
        Line::from("  v        Start/stop selection   a  Label selection"),
        Line::from(""),
        heading("Spans and relations"),
        Line::from("  1-9      Pick label or relation type, or relabel selected span"),
        Line::from("  Tab      Select next span"),
        Line::from("  Enter    Click selected span (twice = relation)"),
        Line::from("  Del/BkSp Delete selected span"),
        Line::from("  Ctrl+Z/u Undo"),
        Line::from(""),
        heading("Documents"),
        Line::from("  ←/→ Space  Previous/next document"),
        Line::from("  c        Complete   r  Reopen   /  Search"),
        Line::from("  s        Save to browser storage"),
        Line::from("  e/E      Download export / cycle format"),
    ];

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
