use spanlink_core::{
    App, AnnotationStore, ContainerId, GridMeasurer, Key, KeyInput, Mode, OverlapPolicy,
    ProjectConfig, RelationInsert, Selection, SpanId, TextRange,
};

const MIKE: &str = "Mike lives in America.";

/// App with `texts` imported and laid out on a 40-cell grid
fn session(texts: &[&str]) -> App {
    let mut app = App::default();
    app.import_texts(texts.iter().copied());
    let mut grid = GridMeasurer::new(ContainerId(0), 40, 3);
    app.prepare_frame(&mut grid);
    app
}

/// Select `[start, end)` through the selection feed, as a host would
fn select(app: &mut App, start: usize, end: usize) -> bool {
    let nodes = app.layout.nodes().cloned().expect("measured");
    let selection = Selection::new(nodes.container(), nodes.boundary_at(start), nodes.boundary_at(end));
    app.selection_finished(Some(&selection))
}

#[test]
fn mike_lives_in_america() {
    let mut app = session(&[MIKE]);

    assert!(select(&mut app, 0, 4));
    let per = app.choose_label("PER").expect("PER span");
    assert!(select(&mut app, 14, 21));
    let loc = app.choose_label("LOC").expect("LOC span");

    let spans = app.store.spans();
    assert_eq!(spans.len(), 2);
    assert_eq!((spans[0].start, spans[0].end, spans[0].label.as_str()), (0, 4, "PER"));
    assert_eq!(spans[1].fragment(MIKE), "America");

    assert_eq!(app.add_relation(per, loc, "LOCATED_IN"), RelationInsert::Added);
    assert_eq!(app.store.relations().len(), 1);

    assert!(app.remove_span(per));
    assert!(app.store.relations().is_empty());
    assert_eq!(app.store.spans().len(), 1);
    assert_eq!(app.store.spans()[0].label, "LOC");
}

#[test]
fn navigation_round_trip_keeps_spans() {
    let mut app = session(&["first document", "second document", "third document"]);
    assert!(select(&mut app, 0, 5));
    let id = app.choose_label("ORG").expect("span");
    let before = app.store.spans().to_vec();

    assert!(app.next_document());
    assert!(app.store.spans().is_empty());
    assert!(app.prev_document());

    assert_eq!(app.navigator.active(), Some(0));
    assert_eq!(app.store.spans(), before.as_slice());
    assert_eq!(app.store.span(id).map(|s| s.label.as_str()), Some("ORG"));
}

#[test]
fn undo_with_empty_history_changes_nothing() {
    let mut app = session(&[MIKE]);
    app.add_span(TextRange::new(0, 4), "PER");
    app.store.take_history();

    let spans = app.store.spans().to_vec();
    assert!(app.handle_key(KeyInput::ctrl(Key::Char('z'))));
    assert_eq!(app.store.spans(), spans.as_slice());
    assert!(app.store.relations().is_empty());
}

#[test]
fn duplicate_relation_is_stored_once() {
    let config = ProjectConfig::default();
    let mut store = AnnotationStore::new();
    store.load(MIKE.chars().count(), Vec::new(), Vec::new(), Vec::new());
    let a = store.add_span(TextRange::new(0, 4), "PER", &config).unwrap();
    let b = store.add_span(TextRange::new(14, 21), "LOC", &config).unwrap();

    assert_eq!(store.add_relation(a, b, "LOCATED_IN", &config), RelationInsert::Added);
    assert_eq!(store.add_relation(a, b, "LOCATED_IN", &config), RelationInsert::Duplicate);
    assert_eq!(store.add_relation(a, b, "WORKS_AT", &config), RelationInsert::Added);
    assert_eq!(store.relations().len(), 2);
    assert_eq!(store.history_len(), 4);
}

#[test]
fn strict_overlap_policy_rejects_and_closes_picker() {
    let mut app = session(&[MIKE]);
    app.config = ProjectConfig::default().with_overlap(OverlapPolicy::Reject);
    app.add_span(TextRange::new(0, 10), "PER");

    assert!(select(&mut app, 5, 13));
    assert_eq!(app.choose_label("LOC"), None);
    assert_eq!(app.mode(), Mode::Idle);
    assert_eq!(app.store.spans().len(), 1);
}

#[test]
fn ids_are_not_reused_across_documents() {
    let mut app = session(&["alpha beta", "gamma delta"]);
    let first = app.add_span(TextRange::new(0, 5), "PER").unwrap();
    app.next_document();
    let second = app.add_span(TextRange::new(0, 5), "LOC").unwrap();
    assert!(second > first);

    app.prev_document();
    app.remove_span(first);
    let third = app.add_span(TextRange::new(6, 10), "ORG").unwrap();
    assert_eq!(third, SpanId(second.0 + 1));
}

#[test]
fn click_chain_then_type_key() {
    let mut app = session(&[MIKE]);
    let per = app.add_span(TextRange::new(0, 4), "PER").unwrap();
    let loc = app.add_span(TextRange::new(14, 21), "LOC").unwrap();

    app.interaction.click_span(per);
    // A text selection in between abandons the chain
    assert!(select(&mut app, 5, 10));
    assert!(app.handle_key(KeyInput::plain(Key::Escape)));
    assert_eq!(app.mode(), Mode::Idle);

    app.interaction.click_span(per);
    app.interaction.click_span(loc);
    assert!(app.handle_key(KeyInput::ctrl(Key::Char('2'))));
    assert_eq!(app.store.relations()[0].relation_type, "WORKS_AT");
}
