use std::ops::Range;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cursor::CursorState;
use crate::error::Result;
use crate::export::{self, ExportFormat};
use crate::interaction::{Interaction, Mode};
use crate::keys::{self, Command, KeyInput};
use crate::layout::{Geometry, LayoutEngine, LayoutInput, Measurer, Point};
use crate::model::{ProjectConfig, SpanId, TextRange};
use crate::navigator::Navigator;
use crate::persistence::{sanitize_document, ProjectStore};
use crate::selection::{resolve, Selection};
use crate::store::{AnnotationStore, RelationInsert, SpanRejection};

/// Which pane receives front-end keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Editor,
    Documents,
}

/// Input target for text input prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTarget {
    ImportPath,
    Search,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub target: InputTarget,
    pub buffer: String,
}

/// Text selection being dragged with the pointer, in character indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextDrag {
    pub anchor: usize,
    pub focus: usize,
    pub moved: bool,
}

/// Platform-agnostic annotation session
pub struct App {
    pub config: ProjectConfig,
    pub project_id: String,
    pub navigator: Navigator,
    pub store: AnnotationStore,
    pub interaction: Interaction,
    pub layout: LayoutEngine,
    pub cursor: CursorState,
    pub focus: Focus,
    pub running: bool,
    pub show_help: bool,

    /// Keyboard visual selection anchor (character index)
    pub visual_anchor: Option<usize>,
    pub text_drag: Option<TextDrag>,
    /// Pointer distance at which a relation arc counts as hovered
    pub hover_tolerance: f32,

    pub prompt: Option<Prompt>,
    /// Highlighted row of the document list
    pub list_selected: usize,
    pub search_hits: Vec<usize>,
    pub export_format: ExportFormat,

    pub status_message: Option<String>,

    text_revision: u64,
    span_revision: u64,
}

impl App {
    pub fn new(config: ProjectConfig) -> Self {
        Self {
            project_id: config.name.clone(),
            config,
            navigator: Navigator::new(),
            store: AnnotationStore::new(),
            interaction: Interaction::new(),
            layout: LayoutEngine::default(),
            cursor: CursorState::new(),
            focus: Focus::Editor,
            running: true,
            show_help: false,

            visual_anchor: None,
            text_drag: None,
            hover_tolerance: 6.0,

            prompt: None,
            list_selected: 0,
            search_hits: Vec::new(),
            export_format: ExportFormat::Jsonl,

            status_message: None,

            text_revision: 0,
            span_revision: 0,
        }
    }

    /// Text of the active document, empty when nothing is loaded
    pub fn active_text(&self) -> &str {
        self.navigator
            .active_document()
            .map(|d| d.text.as_str())
            .unwrap_or("")
    }

    pub fn mode(&self) -> Mode {
        self.interaction.mode()
    }

    /// A prompt is capturing keys
    pub fn in_editable(&self) -> bool {
        self.prompt.is_some()
    }

    pub fn set_status(&mut self, msg: &str) {
        self.status_message = Some(msg.to_string());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    fn document_loaded(&mut self) {
        self.cursor.set_len(self.store.text_len());
        self.interaction.reset();
        self.visual_anchor = None;
        self.text_drag = None;
        self.text_revision += 1;
        self.span_revision += 1;
        if let Some(active) = self.navigator.active() {
            self.list_selected = active;
        }
    }

    /// Bookkeeping after a committed mutation
    fn committed(&mut self) {
        self.span_revision += 1;
        self.interaction.hover_relation(None);
        self.navigator.refresh_active_status(&self.store);
    }

    /// Drop interaction references to spans that no longer exist
    fn prune_interaction(&mut self) {
        let mut referenced: Vec<SpanId> = self.interaction.selected_span().into_iter().collect();
        referenced.extend(self.interaction.mode().relation_origin());
        if let Some((from, to)) = self.interaction.mode().pending_relation() {
            referenced.extend([from, to]);
        }
        for id in referenced {
            if !self.store.contains_span(id) {
                self.interaction.forget_span(id);
            }
        }
    }

    // Documents

    pub fn import_texts<I, S>(&mut self, units: I) -> Range<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let was_active = self.navigator.active();
        let added = self.navigator.import(units, &mut self.store);
        if was_active.is_none() && self.navigator.active().is_some() {
            self.document_loaded();
        }
        let msg = format!("Imported {} documents", added.len());
        self.set_status(&msg);
        added
    }

    pub fn next_document(&mut self) -> bool {
        let moved = self.navigator.next(&mut self.store);
        if moved {
            self.document_loaded();
        }
        moved
    }

    pub fn prev_document(&mut self) -> bool {
        let moved = self.navigator.prev(&mut self.store);
        if moved {
            self.document_loaded();
        }
        moved
    }

    pub fn goto_document(&mut self, index: usize) -> bool {
        let moved = self.navigator.goto(index, &mut self.store);
        if moved {
            self.document_loaded();
        }
        moved
    }

    pub fn remove_document(&mut self, index: usize) -> bool {
        let was_active = self.navigator.active();
        if !self.navigator.remove(index, &mut self.store) {
            return false;
        }
        if was_active == Some(index) {
            self.document_loaded();
        }
        self.list_selected = self.list_selected.min(self.navigator.len().saturating_sub(1));
        self.set_status("Document removed");
        true
    }

    pub fn clear_all_documents(&mut self) {
        self.navigator.clear_all(&mut self.store);
        self.document_loaded();
        self.list_selected = 0;
        self.search_hits.clear();
        self.set_status("All documents cleared");
    }

    pub fn mark_completed(&mut self) -> bool {
        self.navigator.save_current(&self.store);
        let done = self.navigator.mark_completed();
        if done {
            self.set_status("Document completed");
        }
        done
    }

    pub fn reopen_document(&mut self) -> bool {
        let reopened = self.navigator.reopen(&self.store);
        if reopened {
            self.set_status("Document reopened");
        }
        reopened
    }

    /// Record documents matching `query` and jump to the first one
    pub fn search(&mut self, query: &str) -> usize {
        self.search_hits = if query.trim().is_empty() {
            Vec::new()
        } else {
            self.navigator.search(query)
        };
        let hits = self.search_hits.len();
        if let Some(&first) = self.search_hits.first() {
            self.goto_document(first);
            self.list_selected = first;
        }
        let msg = format!("{hits} documents match '{query}'");
        self.set_status(&msg);
        hits
    }

    // Annotation operations

    /// Selection feed: resolve the host selection and open the label picker
    pub fn selection_finished(&mut self, selection: Option<&Selection>) -> bool {
        let text = self.active_text();
        let range = self
            .layout
            .nodes()
            .and_then(|nodes| resolve(selection, nodes, text));
        self.interaction.text_selected(range)
    }

    pub fn choose_label(&mut self, label: &str) -> Option<SpanId> {
        let pending = self.interaction.mode().pending_range();
        let id = self
            .interaction
            .choose_label(label, &mut self.store, &self.config);
        match id {
            Some(id) => {
                self.committed();
                self.interaction.select_span(Some(id));
                let msg = format!("Added {label}");
                self.set_status(&msg);
            }
            None => {
                let reason = pending
                    .filter(|_| self.interaction.mode() == Mode::Idle)
                    .map(|range| {
                        match self.store.check_span(range, label, &self.config, None) {
                            Err(reason) => reason,
                            Ok(()) => SpanRejection::IdsExhausted,
                        }
                    });
                if let Some(reason) = reason {
                    let msg = format!("Span rejected: {reason}");
                    self.set_status(&msg);
                }
            }
        }
        id
    }

    pub fn choose_label_index(&mut self, index: usize) -> Option<SpanId> {
        let label = self.config.label(index)?.to_string();
        self.choose_label(&label)
    }

    pub fn choose_relation_type(&mut self, relation_type: &str) -> RelationInsert {
        let outcome =
            self.interaction
                .choose_relation_type(relation_type, &mut self.store, &self.config);
        match outcome {
            RelationInsert::Added => {
                self.committed();
                let msg = format!("Added {relation_type}");
                self.set_status(&msg);
            }
            RelationInsert::Duplicate => self.set_status("Relation already exists"),
            RelationInsert::Rejected => {}
        }
        outcome
    }

    pub fn choose_relation_type_index(&mut self, index: usize) -> RelationInsert {
        match self.config.relation_type(index) {
            Some(t) => {
                let t = t.to_string();
                self.choose_relation_type(&t)
            }
            None => RelationInsert::Rejected,
        }
    }

    /// Add a span directly, bypassing the picker
    pub fn add_span(&mut self, range: TextRange, label: &str) -> Option<SpanId> {
        let id = self.store.add_span(range, label, &self.config);
        if id.is_some() {
            self.committed();
        }
        id
    }

    /// Add a relation directly, bypassing the picker
    pub fn add_relation(&mut self, from: SpanId, to: SpanId, relation_type: &str) -> RelationInsert {
        let outcome = self.store.add_relation(from, to, relation_type, &self.config);
        if outcome == RelationInsert::Added {
            self.committed();
        }
        outcome
    }

    /// Move or relabel an existing span in place
    pub fn update_span(&mut self, id: SpanId, range: TextRange, label: &str) -> bool {
        if !self.store.update_span(id, range, label, &self.config) {
            return false;
        }
        self.committed();
        let msg = format!("Span {id} is now {label}");
        self.set_status(&msg);
        true
    }

    /// Give the selected span the label at `index`, keeping its range
    pub fn relabel_selected(&mut self, index: usize) -> bool {
        let Some(id) = self.interaction.selected_span() else {
            return false;
        };
        let (Some(range), Some(label)) = (
            self.store.span(id).map(|s| s.range()),
            self.config.label(index).map(str::to_string),
        ) else {
            return false;
        };
        if self.update_span(id, range, &label) {
            return true;
        }
        if let Err(reason) = self.store.check_span(range, &label, &self.config, Some(id)) {
            let msg = format!("Relabel rejected: {reason}");
            self.set_status(&msg);
        }
        false
    }

    pub fn remove_span(&mut self, id: SpanId) -> bool {
        if !self.store.remove_span(id) {
            return false;
        }
        self.interaction.forget_span(id);
        self.committed();
        self.set_status("Span removed");
        true
    }

    pub fn update_relation_type(&mut self, index: usize, relation_type: &str) -> bool {
        if !self.config.has_relation_type(relation_type) {
            return false;
        }
        let changed = self.store.update_relation_type(index, relation_type);
        if changed {
            self.committed();
        }
        changed
    }

    pub fn delete_relation(&mut self, index: usize) -> bool {
        let deleted = self.store.delete_relation(index);
        if deleted {
            self.committed();
            self.set_status("Relation deleted");
        }
        deleted
    }

    /// Delete the selected span, or else the hovered relation
    pub fn delete_selected(&mut self) -> bool {
        if let Some(id) = self.interaction.selected_span() {
            return self.remove_span(id);
        }
        match self.interaction.hovered_relation() {
            Some(index) => self.delete_relation(index),
            None => false,
        }
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.store.undo();
        if undone {
            self.committed();
            self.prune_interaction();
            self.set_status("Undone");
        }
        undone
    }

    pub fn clear_annotations(&mut self) -> bool {
        let cleared = self.store.clear();
        if cleared {
            self.interaction.reset();
            self.committed();
            self.set_status("Annotations cleared");
        }
        cleared
    }

    /// Relation index under the pointer plus its endpoints, for highlighting
    pub fn hovered_endpoints(&self) -> Option<(SpanId, SpanId)> {
        let index = self.interaction.hovered_relation()?;
        let relation = self.store.relations().get(index)?;
        Some((relation.from_id, relation.to_id))
    }

    // Pointer input

    pub fn pointer_down(&mut self, point: Point) {
        if let Some(id) = self.layout.geometry().span_at(point) {
            self.interaction.pointer_down_on_span(id);
            if let Mode::DraggingRelationFrom { .. } = self.interaction.mode() {
                return;
            }
        }
        self.text_drag = self.layout.char_index_at(point).map(|index| TextDrag {
            anchor: index,
            focus: index,
            moved: false,
        });
    }

    /// Pointer moved: extend a text drag, or update relation hover
    pub fn pointer_moved(&mut self, point: Point) {
        if let Some(drag) = self.text_drag.as_mut() {
            if let Some(index) = self.layout.char_index_at(point) {
                if index != drag.focus {
                    drag.focus = index;
                    drag.moved = true;
                }
            }
            return;
        }
        let hovered = self
            .layout
            .geometry()
            .relation_at(point, self.hover_tolerance);
        self.interaction.hover_relation(hovered);
    }

    pub fn pointer_up(&mut self, point: Point) {
        if let Mode::DraggingRelationFrom { .. } = self.interaction.mode() {
            let target = self.layout.geometry().span_at(point);
            self.interaction.pointer_up(target);
            return;
        }
        if let Some(drag) = self.text_drag.take() {
            let selection = self.char_selection(drag.anchor, drag.focus, drag.moved);
            self.selection_finished(selection.as_ref());
        }
    }

    /// Context click: cycle the selection through spans under the pointer
    pub fn context_click(&mut self, point: Point) {
        if let Some(index) = self.layout.char_index_at(point) {
            let covering = self.store.spans_covering(index);
            self.interaction.cycle_selection(&covering);
        }
    }

    /// Selection from character `anchor` to character `focus`, both included,
    /// keeping the drag direction. Collapsed unless `extended`.
    fn char_selection(&self, anchor: usize, focus: usize, extended: bool) -> Option<Selection> {
        let nodes = self.layout.nodes()?;
        let (a, f) = if !extended {
            (nodes.boundary_at(anchor), nodes.boundary_at(anchor))
        } else if focus >= anchor {
            (nodes.boundary_at(anchor), nodes.boundary_at(focus + 1))
        } else {
            (nodes.boundary_at(anchor + 1), nodes.boundary_at(focus))
        };
        Some(Selection::new(nodes.container(), a, f))
    }

    /// Character range covered by an in-progress pointer or keyboard selection
    pub fn selection_preview(&self) -> Option<TextRange> {
        if let Some(drag) = self.text_drag.filter(|d| d.moved) {
            return Some(TextRange::new(
                drag.anchor.min(drag.focus),
                drag.anchor.max(drag.focus) + 1,
            ));
        }
        let anchor = self.visual_anchor?;
        let caret = self.cursor.offset();
        Some(TextRange::new(anchor.min(caret), anchor.max(caret) + 1))
    }

    // Caret movement

    pub fn move_left(&mut self) {
        self.cursor.move_left();
    }

    pub fn move_right(&mut self) {
        self.cursor.move_right();
    }

    pub fn move_up(&mut self) {
        self.cursor.move_up(self.layout.rects());
    }

    pub fn move_down(&mut self) {
        self.cursor.move_down(self.layout.rects());
    }

    pub fn move_to_top(&mut self) {
        self.cursor.move_to_top();
    }

    pub fn move_to_bottom(&mut self) {
        self.cursor.move_to_bottom();
    }

    pub fn move_word_forward(&mut self) {
        let text = self
            .navigator
            .active_document()
            .map(|d| d.text.as_str())
            .unwrap_or("");
        self.cursor.move_word_forward(text);
    }

    pub fn move_word_back(&mut self) {
        let text = self
            .navigator
            .active_document()
            .map(|d| d.text.as_str())
            .unwrap_or("");
        self.cursor.move_word_back(text);
    }

    // Keyboard selection

    pub fn toggle_visual(&mut self) {
        self.visual_anchor = match self.visual_anchor {
            Some(_) => None,
            None if self.store.text_len() > 0 => Some(self.cursor.offset()),
            None => None,
        };
    }

    /// Finish the keyboard selection as if the pointer had been released
    pub fn annotate_visual(&mut self) -> bool {
        let Some(anchor) = self.visual_anchor.take() else {
            return false;
        };
        let selection = self.char_selection(anchor, self.cursor.offset(), true);
        self.selection_finished(selection.as_ref())
    }

    /// Move the selected span to the next (or previous) one in start order
    pub fn cycle_selected_span(&mut self, forward: bool) {
        let mut ids: Vec<(usize, usize, SpanId)> = self
            .store
            .spans()
            .iter()
            .map(|s| (s.start, s.end, s.id))
            .collect();
        if ids.is_empty() {
            return;
        }
        ids.sort();
        let current = self
            .interaction
            .selected_span()
            .and_then(|id| ids.iter().position(|(_, _, s)| *s == id));
        let next = match (current, forward) {
            (None, true) => 0,
            (None, false) => ids.len() - 1,
            (Some(i), true) => (i + 1) % ids.len(),
            (Some(i), false) => (i + ids.len() - 1) % ids.len(),
        };
        let (start, _, id) = ids[next];
        self.interaction.select_span(Some(id));
        self.cursor.set_offset(start);
    }

    /// Click the selected span (drives the click-click relation gesture)
    pub fn click_selected_span(&mut self) {
        if let Some(id) = self.interaction.selected_span() {
            self.interaction.click_span(id);
        }
    }

    // Keyboard dispatch

    /// Route a key through the shared bindings. Returns false when the key
    /// is left to the front end.
    pub fn handle_key(&mut self, input: KeyInput) -> bool {
        let input = KeyInput {
            in_editable: input.in_editable || self.in_editable(),
            ..input
        };
        match keys::route(&input, &self.interaction.mode()) {
            Some(command) => {
                self.apply(command);
                true
            }
            None => false,
        }
    }

    pub fn apply(&mut self, command: Command) {
        debug!(?command, mode = self.interaction.mode().name(), "key command");
        match command {
            Command::ChooseLabel(i) => {
                self.choose_label_index(i);
            }
            Command::ChooseRelationType(i) => {
                self.choose_relation_type_index(i);
            }
            Command::RelabelSelected(i) => {
                self.relabel_selected(i);
            }
            Command::NextDocument => {
                self.next_document();
            }
            Command::PrevDocument => {
                self.prev_document();
            }
            Command::DeleteSelected => {
                self.delete_selected();
            }
            Command::ClearPending => {
                self.interaction.escape();
                self.visual_anchor = None;
                self.text_drag = None;
                self.show_help = false;
            }
            Command::Undo => {
                self.undo();
            }
            Command::Ignore => {}
        }
    }

    // Layout

    /// Measure-then-paint: bring geometry up to date before drawing
    pub fn prepare_frame(&mut self, measurer: &mut dyn Measurer) -> &Geometry {
        let text = self
            .navigator
            .active_document()
            .map(|d| d.text.as_str())
            .unwrap_or("");
        let input = LayoutInput {
            text,
            text_revision: self.text_revision,
            spans: self.store.spans(),
            span_revision: self.span_revision,
            relations: self.store.relations(),
        };
        self.layout.prepare(input, measurer)
    }

    // Storage

    pub fn save_project(&mut self, backend: &mut dyn ProjectStore) -> bool {
        self.navigator.save_current(&self.store);
        match backend.save_documents(&self.project_id, &self.config, self.navigator.documents()) {
            Ok(ids) => {
                self.navigator.assign_ids(&ids);
                info!(project = %self.project_id, documents = ids.len(), "project saved");
                let msg = format!("Saved {} documents", ids.len());
                self.set_status(&msg);
                true
            }
            Err(err) => {
                warn!(project = %self.project_id, error = %err, "save failed");
                let msg = format!("Save failed: {err}");
                self.set_status(&msg);
                false
            }
        }
    }

    pub fn load_project(&mut self, backend: &mut dyn ProjectStore, project_id: &str) -> bool {
        match backend.load_documents(project_id) {
            Ok(mut project) => {
                for doc in &mut project.documents {
                    sanitize_document(doc);
                }
                let count = project.documents.len();
                self.config = project.config;
                self.project_id = project_id.to_string();
                self.navigator.replace_all(project.documents, &mut self.store);
                self.document_loaded();
                self.search_hits.clear();
                info!(project = project_id, documents = count, "project loaded");
                let msg = format!("Loaded {count} documents");
                self.set_status(&msg);
                true
            }
            Err(err) => {
                warn!(project = project_id, error = %err, "load failed");
                let msg = format!("Load failed: {err}");
                self.set_status(&msg);
                false
            }
        }
    }

    /// Append the active document as a single record
    pub fn save_record(&mut self, backend: &mut dyn ProjectStore) -> bool {
        self.navigator.save_current(&self.store);
        let Some(doc) = self.navigator.active_document() else {
            return false;
        };
        match backend.save_one_record(&self.project_id, doc) {
            Ok(()) => {
                self.set_status("Record saved");
                true
            }
            Err(err) => {
                warn!(project = %self.project_id, error = %err, "record save failed");
                let msg = format!("Record save failed: {err}");
                self.set_status(&msg);
                false
            }
        }
    }

    /// Export file name and contents for the current export scope
    pub fn export(&mut self, format: ExportFormat) -> Result<(String, String)> {
        self.navigator.save_current(&self.store);
        let documents = self.navigator.export_documents();
        let content = export::render(format, &self.config, &documents)?;
        let name = export::export_file_name(&self.project_id, format.extension(), Utc::now());
        info!(file = %name, documents = documents.len(), "export rendered");
        Ok((name, content))
    }

    /// Get title for display
    pub fn title(&self) -> String {
        match self.navigator.active() {
            Some(i) => format!("{} · {}/{}", self.config.name, i + 1, self.navigator.len()),
            None => self.config.name.clone(),
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new(ProjectConfig::default())
    }
}
