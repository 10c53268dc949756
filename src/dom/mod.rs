pub mod document;
pub mod parse;
pub mod properties;
pub mod query;
pub mod visibility;

pub use document::{
    ComputedStyle, Document, IntersectionEntry, MutationKind, MutationRecord, NodeId, Rect,
};
pub use query::DomQueryService;
pub use visibility::DomElementVisibilityService;
