mod document;
mod project;
mod relation;
mod span;
mod text_range;

pub use document::{derive_status, DocStatus, Document};
pub use project::{OverlapPolicy, ProjectConfig};
pub use relation::Relation;
pub use span::{Span, SpanId};
pub use text_range::TextRange;
