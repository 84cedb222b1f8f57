//! Semantic model of an analyzed program
//!
//! Entities (namespaces, classes, members, globals) and the typed relations
//! between them, frozen before analysis starts.

mod document;
pub mod interner;
pub mod lexical;
mod store;
mod types;

pub use document::{EdgeRecord, EntityRecord, ModelDocument};
pub use interner::{StrKey, StringInterner};
pub use lexical::{
    Binding, CastKind, Delimiter, LexToken, LexicalStream, Operand, OperandKey, Operator,
};
pub use store::{ModelStats, SemanticModel};
pub use types::{
    CommentRole, CommentSpan, DeclSpan, EdgeKind, EdgeView, Entity, EntityDecl, EntityId,
    EntityKind, Relation, SizeInfo,
};
