//! Interaction state machine for span and relation creation.
//!
//! Exactly one [`Mode`] is active at a time. Pointer gestures, picker choices
//! and keyboard commands all go through the methods here, so the two relation
//! gestures (press-drag-release and click-then-click) share one set of guards
//! and cannot race each other.

use tracing::{debug, trace};

use crate::model::{ProjectConfig, SpanId, TextRange};
use crate::store::{AnnotationStore, RelationInsert};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Idle,
    /// A text range is waiting for a label
    PendingLabelChoice(TextRange),
    /// Pointer pressed on `from` and not yet released. `click_origin` keeps a
    /// click-chain origin alive in case the release turns out to be a click.
    DraggingRelationFrom {
        from: SpanId,
        click_origin: Option<SpanId>,
    },
    /// First span of a click-click relation has been clicked
    AwaitingSecondEndpoint(SpanId),
    PendingRelationTypeChoice {
        from: SpanId,
        to: SpanId,
    },
}

impl Mode {
    pub fn pending_range(&self) -> Option<TextRange> {
        match self {
            Mode::PendingLabelChoice(range) => Some(*range),
            _ => None,
        }
    }

    pub fn pending_relation(&self) -> Option<(SpanId, SpanId)> {
        match self {
            Mode::PendingRelationTypeChoice { from, to } => Some((*from, *to)),
            _ => None,
        }
    }

    pub fn is_picker_open(&self) -> bool {
        matches!(
            self,
            Mode::PendingLabelChoice(_) | Mode::PendingRelationTypeChoice { .. }
        )
    }

    /// Span the next relation will start from, if one is being drawn
    pub fn relation_origin(&self) -> Option<SpanId> {
        match self {
            Mode::DraggingRelationFrom { from, .. } => Some(*from),
            Mode::AwaitingSecondEndpoint(origin) => Some(*origin),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Idle => "IDLE",
            Mode::PendingLabelChoice(_) => "LABEL",
            Mode::DraggingRelationFrom { .. } => "DRAG",
            Mode::AwaitingSecondEndpoint(_) => "LINK",
            Mode::PendingRelationTypeChoice { .. } => "RELATION",
        }
    }

    fn references(&self, id: SpanId) -> bool {
        match *self {
            Mode::Idle | Mode::PendingLabelChoice(_) => false,
            Mode::DraggingRelationFrom { from, click_origin } => {
                from == id || click_origin == Some(id)
            }
            Mode::AwaitingSecondEndpoint(origin) => origin == id,
            Mode::PendingRelationTypeChoice { from, to } => from == id || to == id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Interaction {
    mode: Mode,
    selected: Option<SpanId>,
    hovered_relation: Option<usize>,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn selected_span(&self) -> Option<SpanId> {
        self.selected
    }

    pub fn select_span(&mut self, id: Option<SpanId>) {
        self.selected = id;
    }

    pub fn hovered_relation(&self) -> Option<usize> {
        self.hovered_relation
    }

    pub fn hover_relation(&mut self, index: Option<usize>) {
        self.hovered_relation = index;
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            trace!(from = self.mode.name(), to = mode.name(), "mode change");
        }
        self.mode = mode;
    }

    /// Pointer released after selecting text.
    ///
    /// Ignored while a relation is being dragged or typed. Any click-chain
    /// origin is dropped. Returns true when the label picker opened.
    pub fn text_selected(&mut self, range: Option<TextRange>) -> bool {
        if matches!(
            self.mode,
            Mode::DraggingRelationFrom { .. } | Mode::PendingRelationTypeChoice { .. }
        ) {
            return false;
        }
        if let Mode::AwaitingSecondEndpoint(_) = self.mode {
            self.set_mode(Mode::Idle);
        }
        match range {
            Some(range) => {
                self.set_mode(Mode::PendingLabelChoice(range));
                true
            }
            None => false,
        }
    }

    /// Commit the pending range with `label`.
    ///
    /// A label outside the vocabulary leaves the picker open; any vocabulary
    /// label closes it, even if the store rejects the span.
    pub fn choose_label(
        &mut self,
        label: &str,
        store: &mut AnnotationStore,
        config: &ProjectConfig,
    ) -> Option<SpanId> {
        let Mode::PendingLabelChoice(range) = self.mode else {
            return None;
        };
        if !config.has_label(label) {
            return None;
        }
        let id = store.add_span(range, label, config);
        self.set_mode(Mode::Idle);
        id
    }

    pub fn pointer_down_on_span(&mut self, id: SpanId) {
        let click_origin = match self.mode {
            Mode::Idle => None,
            Mode::AwaitingSecondEndpoint(origin) => Some(origin),
            _ => return,
        };
        self.selected = Some(id);
        self.set_mode(Mode::DraggingRelationFrom {
            from: id,
            click_origin,
        });
    }

    /// Pointer released over `target` (or over no span).
    ///
    /// Releasing on a different span ends a drag; releasing on the pressed
    /// span is a click on it.
    pub fn pointer_up(&mut self, target: Option<SpanId>) {
        let Mode::DraggingRelationFrom { from, click_origin } = self.mode else {
            return;
        };
        match target {
            Some(to) if to != from => {
                debug!(%from, %to, "relation dragged");
                self.set_mode(Mode::PendingRelationTypeChoice { from, to });
            }
            Some(_) => {
                self.set_mode(click_origin.map_or(Mode::Idle, Mode::AwaitingSecondEndpoint));
                self.click_span(from);
            }
            None => self.set_mode(Mode::Idle),
        }
    }

    pub fn click_span(&mut self, id: SpanId) {
        match self.mode {
            Mode::Idle => {
                self.selected = Some(id);
                self.set_mode(Mode::AwaitingSecondEndpoint(id));
            }
            Mode::AwaitingSecondEndpoint(origin) if origin != id => {
                debug!(from = %origin, to = %id, "relation clicked");
                self.set_mode(Mode::PendingRelationTypeChoice { from: origin, to: id });
            }
            Mode::AwaitingSecondEndpoint(_) => self.set_mode(Mode::Idle),
            _ => {}
        }
    }

    /// Commit the pending relation with `relation_type`.
    ///
    /// A type outside the vocabulary leaves the picker open; a duplicate
    /// closes it without adding anything.
    pub fn choose_relation_type(
        &mut self,
        relation_type: &str,
        store: &mut AnnotationStore,
        config: &ProjectConfig,
    ) -> RelationInsert {
        let Mode::PendingRelationTypeChoice { from, to } = self.mode else {
            return RelationInsert::Rejected;
        };
        if !config.has_relation_type(relation_type) {
            return RelationInsert::Rejected;
        }
        let outcome = store.add_relation(from, to, relation_type, config);
        self.set_mode(Mode::Idle);
        outcome
    }

    /// Context click over a character covered by `covering` (in list order):
    /// select the next covering span after the current one, wrapping around.
    pub fn cycle_selection(&mut self, covering: &[SpanId]) {
        if covering.is_empty() {
            return;
        }
        let next = match self.selected.and_then(|id| covering.iter().position(|c| *c == id)) {
            Some(pos) => (pos + 1) % covering.len(),
            None => 0,
        };
        self.selected = Some(covering[next]);
    }

    /// Drop every pending picker, gesture and selection
    pub fn escape(&mut self) {
        self.set_mode(Mode::Idle);
        self.selected = None;
        self.hovered_relation = None;
    }

    /// Forget a span that no longer exists
    pub fn forget_span(&mut self, id: SpanId) {
        if self.selected == Some(id) {
            self.selected = None;
        }
        if self.mode.references(id) {
            self.set_mode(Mode::Idle);
        }
    }

    /// Return to a clean slate, e.g. after switching documents
    pub fn reset(&mut self) {
        self.escape();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: SpanId = SpanId(1);
    const B: SpanId = SpanId(2);

    fn store_with_two_spans() -> (AnnotationStore, ProjectConfig) {
        let config = ProjectConfig::default();
        let mut store = AnnotationStore::new();
        store.load(22, Vec::new(), Vec::new(), Vec::new());
        store.add_span(TextRange::new(0, 4), "PER", &config);
        store.add_span(TextRange::new(14, 21), "LOC", &config);
        (store, config)
    }

    #[test]
    fn label_flow_commits_and_returns_to_idle() {
        let (mut store, config) = store_with_two_spans();
        let mut ix = Interaction::new();

        assert!(!ix.text_selected(None));
        assert!(ix.text_selected(Some(TextRange::new(5, 10))));
        assert_eq!(ix.mode(), Mode::PendingLabelChoice(TextRange::new(5, 10)));

        assert_eq!(ix.choose_label("MISC", &mut store, &config), None);
        assert!(ix.mode().pending_range().is_some());

        assert_eq!(ix.choose_label("ORG", &mut store, &config), Some(SpanId(3)));
        assert_eq!(ix.mode(), Mode::Idle);
    }

    #[test]
    fn drag_between_spans_opens_type_picker() {
        let mut ix = Interaction::new();
        ix.pointer_down_on_span(A);
        assert_eq!(ix.selected_span(), Some(A));
        ix.pointer_up(Some(B));
        assert_eq!(ix.mode(), Mode::PendingRelationTypeChoice { from: A, to: B });
    }

    #[test]
    fn drag_released_nowhere_returns_to_idle() {
        let mut ix = Interaction::new();
        ix.pointer_down_on_span(A);
        ix.pointer_up(None);
        assert_eq!(ix.mode(), Mode::Idle);
    }

    #[test]
    fn press_release_on_same_span_is_a_click() {
        let mut ix = Interaction::new();
        ix.pointer_down_on_span(A);
        ix.pointer_up(Some(A));
        assert_eq!(ix.mode(), Mode::AwaitingSecondEndpoint(A));

        ix.pointer_down_on_span(B);
        ix.pointer_up(Some(B));
        assert_eq!(ix.mode(), Mode::PendingRelationTypeChoice { from: A, to: B });
    }

    #[test]
    fn click_chain_on_itself_cancels() {
        let mut ix = Interaction::new();
        ix.click_span(A);
        ix.click_span(A);
        assert_eq!(ix.mode(), Mode::Idle);
    }

    #[test]
    fn text_selection_is_ignored_mid_relation() {
        let mut ix = Interaction::new();
        ix.pointer_down_on_span(A);
        assert!(!ix.text_selected(Some(TextRange::new(0, 2))));
        ix.pointer_up(Some(B));
        assert!(!ix.text_selected(Some(TextRange::new(0, 2))));
        assert!(ix.mode().pending_relation().is_some());
    }

    #[test]
    fn text_selection_drops_click_origin() {
        let mut ix = Interaction::new();
        ix.click_span(A);
        assert!(ix.text_selected(Some(TextRange::new(5, 9))));
        assert!(ix.mode().relation_origin().is_none());
    }

    #[test]
    fn relation_type_choice_commits_once() {
        let (mut store, config) = store_with_two_spans();
        let mut ix = Interaction::new();

        ix.click_span(A);
        ix.click_span(B);
        assert_eq!(
            ix.choose_relation_type("NOPE", &mut store, &config),
            RelationInsert::Rejected
        );
        assert!(ix.mode().pending_relation().is_some());
        assert_eq!(
            ix.choose_relation_type("LOCATED_IN", &mut store, &config),
            RelationInsert::Added
        );
        assert_eq!(ix.mode(), Mode::Idle);

        ix.click_span(A);
        ix.click_span(B);
        assert_eq!(
            ix.choose_relation_type("LOCATED_IN", &mut store, &config),
            RelationInsert::Duplicate
        );
        assert_eq!(ix.mode(), Mode::Idle);
        assert_eq!(store.relations().len(), 1);
    }

    #[test]
    fn context_click_cycles_covering_spans() {
        let mut ix = Interaction::new();
        let covering = [A, B, SpanId(3)];
        ix.cycle_selection(&covering);
        assert_eq!(ix.selected_span(), Some(A));
        ix.cycle_selection(&covering);
        ix.cycle_selection(&covering);
        assert_eq!(ix.selected_span(), Some(SpanId(3)));
        ix.cycle_selection(&covering);
        assert_eq!(ix.selected_span(), Some(A));
        ix.cycle_selection(&[]);
        assert_eq!(ix.selected_span(), Some(A));
    }

    #[test]
    fn forgetting_a_span_clears_references() {
        let mut ix = Interaction::new();
        ix.click_span(A);
        ix.forget_span(A);
        assert_eq!(ix.mode(), Mode::Idle);
        assert_eq!(ix.selected_span(), None);
    }

    #[test]
    fn escape_clears_everything() {
        let mut ix = Interaction::new();
        ix.text_selected(Some(TextRange::new(0, 3)));
        ix.select_span(Some(A));
        ix.hover_relation(Some(0));
        ix.escape();
        assert_eq!(ix.mode(), Mode::Idle);
        assert_eq!(ix.selected_span(), None);
        assert_eq!(ix.hovered_relation(), None);
    }
}
