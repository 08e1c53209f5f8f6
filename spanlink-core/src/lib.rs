//! Spanlink Core - Platform-agnostic span and relation annotation engine
//!
//! This crate holds the data model, the offset resolver, the annotation store
//! with undo, the layout engine that turns character rectangles into span
//! highlights and relation arcs, the interaction state machine with its
//! keyboard bindings, and the document navigator. It builds for native
//! front-ends and for WASM.

pub mod app;
pub mod cursor;
pub mod error;
pub mod export;
pub mod import;
pub mod interaction;
pub mod keys;
pub mod layout;
pub mod model;
pub mod navigator;
pub mod persistence;
pub mod selection;
pub mod store;

pub use app::{App, Focus, InputTarget, Prompt};
pub use cursor::CursorState;
pub use error::{Error, Result};
pub use export::ExportFormat;
pub use import::{split_text, SplitStrategy};
pub use interaction::{Interaction, Mode};
pub use keys::{Command, Key, KeyInput};
pub use layout::{ArcStyle, CharRect, Geometry, GridMeasurer, LayoutEngine, Measurer, Point};
pub use model::{
    derive_status, DocStatus, Document, OverlapPolicy, ProjectConfig, Relation, Span, SpanId,
    TextRange,
};
pub use navigator::Navigator;
pub use persistence::{LoadedProject, MemoryStore, ProjectStore};
pub use selection::{resolve, Boundary, ContainerId, RenderNodes, Selection};
pub use store::{AnnotationStore, RelationInsert, Snapshot, SpanRejection};
