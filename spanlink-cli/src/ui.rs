//! Terminal UI rendering

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
    Frame,
};

use spanlink_core::layout::RelationArc;
use spanlink_core::{App, ContainerId, Focus, GridMeasurer, InputTarget, Mode, Point, SpanId};

// Catppuccin Mocha colors
const SURFACE0: Color = Color::Rgb(49, 50, 68);
const SURFACE1: Color = Color::Rgb(69, 71, 90);
const SURFACE2: Color = Color::Rgb(88, 91, 112);
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

pub const TEXT_CONTAINER: ContainerId = ContainerId(0);

/// Where the editor was painted, for mapping mouse cells back to text
#[derive(Debug, Clone, Copy)]
pub struct View {
    pub editor: Rect,
    pub scroll: u16,
    pub line_height: u16,
}

impl View {
    pub fn new(line_height: u16) -> Self {
        Self {
            editor: Rect::default(),
            scroll: 0,
            line_height,
        }
    }

    /// Centre of a terminal cell in layout coordinates, if inside the editor
    pub fn to_layout(&self, column: u16, row: u16) -> Option<Point> {
        let pos = Position::new(column, row);
        if !self.editor.contains(pos) {
            return None;
        }
        Some(Point::new(
            (column - self.editor.x) as f32 + 0.5,
            (row - self.editor.y + self.scroll) as f32 + 0.5,
        ))
    }

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

    fn is_text_row(&self, row: u16) -> bool {
        (row + 1) % self.line_height == 0
    }
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
        Mode::PendingLabelChoice(_) => draw_label_picker(frame, app),
        Mode::PendingRelationTypeChoice { .. } => draw_relation_picker(frame, app),
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
            Constraint::Length(36), // Sidebar
        ])
        .split(area);

    draw_editor(frame, app, view, chunks[0]);
    draw_sidebar(frame, app, chunks[1]);
}

fn draw_editor(frame: &mut Frame, app: &mut App, view: &mut View, area: Rect) {
    let editor_style = if app.focus == Focus::Editor {
        Style::default().fg(BLUE)
    } else {
        Style::default().fg(SUBTEXT0)
    };

    let mode_indicator = match (app.visual_anchor, app.mode()) {
        (Some(_), _) => " [VISUAL]".to_string(),
        (None, Mode::Idle) => String::new(),
        (None, mode) => format!(" [{}]", mode.name()),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(editor_style)
        .title(format!("Text{}", mode_indicator));

    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    // Measure before painting anything that reads geometry
    let mut grid = GridMeasurer::new(TEXT_CONTAINER, inner.width, view.line_height);
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
    paint_arcs(buf, app, view);
}

fn paint_text(buf: &mut Buffer, app: &App, view: &View) {
    let rects = app.layout.rects();
    let chars: Vec<char> = app.active_text().chars().collect();
    let selected = app.interaction.selected_span();
    let origin = app.mode().relation_origin();
    let hovered = app.hovered_endpoints();
    let highlight = app.selection_preview().or(app.mode().pending_range());
    let caret = (app.focus == Focus::Editor).then(|| app.cursor.offset());

    // Later spans paint over earlier ones
    let mut owner: Vec<Option<(SpanId, &str)>> = vec![None; chars.len()];
    for span in app.store.spans() {
        for slot in owner.iter_mut().take(span.end).skip(span.start) {
            *slot = Some((span.id, span.label.as_str()));
        }
    }

    for (i, (ch, rect)) in chars.iter().zip(rects).enumerate() {
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
            if hovered.is_some_and(|(from, to)| from == id || to == id) {
                style = style.bg(SURFACE2);
            }
        }
        if highlight.is_some_and(|r| r.contains(i)) {
            style = style.bg(SURFACE1).add_modifier(Modifier::BOLD);
        }
        if caret == Some(i) {
            style = style.add_modifier(Modifier::REVERSED);
        }

        if let Some(cell) = buf.cell_mut(pos) {
            cell.set_char(*ch).set_style(style);
        }
    }
}

fn paint_arcs(buf: &mut Buffer, app: &App, view: &View) {
    let hovered = app.interaction.hovered_relation();
    for (index, arc) in app.layout.geometry().arcs.iter().enumerate() {
        let Some(arc) = arc else {
            continue;
        };
        let Some(relation) = app.store.relations().get(index) else {
            continue;
        };
        let stroke = app.layout.style.stroke(hovered == Some(index));
        let mut style = Style::default().fg(if hovered == Some(index) { PEACH } else { OVERLAY0 });
        if stroke.width > app.layout.style.stroke_width {
            style = style.add_modifier(Modifier::BOLD);
        }
        paint_arc(buf, view, arc, &relation.relation_type, style);
    }
}

/// Plot a relation arc into the blank rows above the text.
///
/// The curve's upper row becomes a horizontal bar with corners; its lower row
/// gets a stem at the source and an arrowhead at the target.
fn paint_arc(buf: &mut Buffer, view: &View, arc: &RelationArc, label: &str, style: Style) {
    let lower = arc.p0.y.round();
    let upper = arc.peak.y.round();
    let upper_ok = upper >= 0.0 && upper < lower && !view.is_text_row(upper as u16);
    let bar_row = if upper_ok { upper } else { lower };

    let samples = ((arc.p3.x - arc.p0.x).abs() as usize * 2).max(8);
    let mut put = |x: f32, y: f32, ch: char| {
        if y < 0.0 || view.is_text_row(y as u16) {
            return;
        }
        if let Some(cell) = view.to_screen(x, y).and_then(|pos| buf.cell_mut(pos)) {
            cell.set_char(ch).set_style(style);
        }
    };

    for p in arc.sample(samples) {
        if p.y.round() == bar_row || !upper_ok {
            put(p.x, bar_row, '─');
        }
    }

    let (left, right) = if arc.p0.x <= arc.p3.x {
        (arc.p0.x, arc.p3.x)
    } else {
        (arc.p3.x, arc.p0.x)
    };
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
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ])
        .split(area);

    draw_documents(frame, app, chunks[0]);
    draw_spans(frame, app, chunks[1]);
    draw_relations(frame, app, chunks[2]);
}

fn draw_documents(frame: &mut Frame, app: &App, area: Rect) {
    let border = if app.focus == Focus::Documents {
        Style::default().fg(BLUE)
    } else {
        Style::default().fg(SUBTEXT0)
    };
    let marked = app.navigator.export_selection().len();
    let title = if marked > 0 {
        format!("Documents ({}, {} marked)", app.navigator.len(), marked)
    } else {
        format!("Documents ({})", app.navigator.len())
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(title);

    let width = area.width.saturating_sub(8) as usize;
    let items: Vec<ListItem> = app
        .navigator
        .documents()
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            let active = app.navigator.active() == Some(i);
            let mark = if app.navigator.is_selected_for_export(i) { '*' } else { ' ' };
            let hit = app.search_hits.contains(&i);
            let style = match (active, hit) {
                (true, _) => Style::default().fg(BLUE).add_modifier(Modifier::BOLD),
                (false, true) => Style::default().fg(YELLOW),
                _ => Style::default().fg(TEXT),
            };
            ListItem::new(format!(
                "{}{} {:>3} {}",
                mark,
                doc.status.glyph(),
                i + 1,
                doc.preview(width)
            ))
            .style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(SURFACE1));
    let mut state = ListState::default().with_selected(Some(app.list_selected));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_spans(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(SUBTEXT0))
        .title(format!("Spans ({})", app.store.spans().len()));

    let text = app.active_text();
    let selected = app.interaction.selected_span();
    let mut spans: Vec<_> = app.store.spans().iter().collect();
    spans.sort_by_key(|s| (s.start, s.end));

    let items: Vec<ListItem> = spans
        .into_iter()
        .map(|span| {
            let fragment: String = span.fragment(text).chars().take(18).collect();
            let marker = if Some(span.id) == selected { ">" } else { " " };
            let style = Style::default().fg(label_color(app, &span.label));
            let style = if Some(span.id) == selected {
                style.bg(SURFACE1)
            } else {
                style
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{}#{} {} ", marker, span.id, span.label), style),
                Span::styled(fragment.replace('\n', " "), Style::default().fg(SUBTEXT0)),
            ]))
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn draw_relations(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(SUBTEXT0))
        .title(format!("Relations ({})", app.store.relations().len()));

    let label_of = |id: SpanId| {
        app.store
            .span(id)
            .map(|s| s.label.clone())
            .unwrap_or_else(|| "?".to_string())
    };
    let hovered = app.interaction.hovered_relation();

    let items: Vec<ListItem> = app
        .store
        .relations()
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let style = if hovered == Some(i) {
                Style::default().fg(PEACH).bg(SURFACE1)
            } else {
                Style::default().fg(TEXT)
            };
            ListItem::new(format!(
                "#{}{} -{}-> #{}{}",
                r.from_id,
                label_of(r.from_id),
                r.relation_type,
                r.to_id,
                label_of(r.to_id)
            ))
            .style(style)
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status = app.status_message.as_deref().unwrap_or("");

    let help_hint = match app.mode() {
        Mode::PendingLabelChoice(_) => "1-9 label | Space first label | Esc cancel",
        Mode::PendingRelationTypeChoice { .. } => "Ctrl+1-9 or 1-9 type | Esc cancel",
        Mode::AwaitingSecondEndpoint(_) => "click or Tab+Enter the target span | Esc cancel",
        _ => "v select | a label | Tab span | Enter link | ←/→ doc | s save | ? help",
    };

    let status_text = format!(
        " {} | {} | export:{}",
        app.mode().name(),
        if status.is_empty() { help_hint } else { status },
        app.export_format.extension(),
    );

    let status_bar = Paragraph::new(status_text).style(Style::default().fg(SUBTEXT0).bg(SURFACE0));
    frame.render_widget(status_bar, area);
}

fn draw_label_picker(frame: &mut Frame, app: &App) {
    let labels = &app.config.labels;
    let area = centered_rect(40, labels.len().min(9) as u16 + 4, frame.area());
    frame.render_widget(Clear, area);

    let fragment: String = app
        .mode()
        .pending_range()
        .map(|r| app.active_text().chars().skip(r.start).take(r.len().min(24)).collect())
        .unwrap_or_default();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(MAUVE))
        .title(format!("Label \"{}\"", fragment.replace('\n', " ")));

    let items: Vec<ListItem> = labels
        .iter()
        .take(9)
        .enumerate()
        .map(|(i, label)| {
            ListItem::new(format!("{} {}", i + 1, label))
                .style(Style::default().fg(label_color(app, label)))
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn draw_relation_picker(frame: &mut Frame, app: &App) {
    let types = &app.config.relation_types;
    let area = centered_rect(44, types.len().min(9) as u16 + 4, frame.area());
    frame.render_widget(Clear, area);

    let title = match app.mode().pending_relation() {
        Some((from, to)) => format!("Relation #{} -> #{}", from, to),
        None => "Relation".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(PEACH))
        .title(title);

    let items: Vec<ListItem> = types
        .iter()
        .take(9)
        .enumerate()
        .map(|(i, t)| ListItem::new(format!("Ctrl+{} {}", i + 1, t)).style(Style::default().fg(TEAL)))
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn draw_input_dialog(frame: &mut Frame, app: &App) {
    let Some(prompt) = &app.prompt else {
        return;
    };
    let area = centered_rect(60, 3, frame.area());
    frame.render_widget(Clear, area);

    let title = match prompt.target {
        InputTarget::ImportPath => "Import file path",
        InputTarget::Search => "Search documents",
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(GREEN))
        .title(title);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let input = Paragraph::new(format!("{}_", prompt.buffer)).style(Style::default().fg(TEXT));
    frame.render_widget(input, inner);
}

fn draw_help(frame: &mut Frame) {
    let area = centered_rect(62, 30, frame.area());
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
        Line::from("  g/G      Top/bottom"),
        Line::from("  v        Start/stop selection   a  Label selection"),
        Line::from("  mouse    Drag over text to select"),
        Line::from(""),
        heading("Spans and relations"),
        Line::from("  1-9      Pick label (Space = first), or relabel selected span"),
        Line::from("  Ctrl+1-9 Pick relation type"),
        Line::from("  Tab      Select next span (Shift+Tab previous)"),
        Line::from("  Enter    Click selected span (twice = relation)"),
        Line::from("  drag     From one span to another = relation"),
        Line::from("  right    Cycle overlapping spans"),
        Line::from("  Del/BkSp Delete selected span or hovered relation"),
        Line::from("  Ctrl+Z/u Undo          X  Clear document"),
        Line::from(""),
        heading("Documents"),
        Line::from("  ←/→ Space  Previous/next document"),
        Line::from("  f        Focus document list (j/k, Enter)"),
        Line::from("  x        Mark for export   D  Remove"),
        Line::from("  c        Complete and save record   r  Reopen"),
        Line::from("  o        Import file       /  Search"),
        Line::from(""),
        heading("Project"),
        Line::from("  s        Save project"),
        Line::from("  e/E      Export / cycle export format"),
        Line::from("  q        Save and quit"),
    ];

    let paragraph = Paragraph::new(help_text).block(block);
    frame.render_widget(paragraph, area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
