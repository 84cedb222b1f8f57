use serde::{Deserialize, Serialize};
use std::fmt;

use super::interner::StrKey;
use super::lexical::LexicalStream;

/// Stable entity handle; equals the node position in the model arena
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub(crate) u32);

impl EntityId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Entity kinds in the semantic model
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Program,
    Namespace,
    Class,
    TemplateClass,
    TemplateSpecialization,
    Method,
    Attribute,
    GlobalFunction,
    GlobalVariable,
}

impl EntityKind {
    /// Classes, generic templates and their specializations
    pub fn is_class_like(self) -> bool {
        match self {
            EntityKind::Class | EntityKind::TemplateClass | EntityKind::TemplateSpecialization => {
                true
            }
            EntityKind::Program
            | EntityKind::Namespace
            | EntityKind::Method
            | EntityKind::Attribute
            | EntityKind::GlobalFunction
            | EntityKind::GlobalVariable => false,
        }
    }

    /// Program and namespaces: the targets of metric rollup
    pub fn is_scope(self) -> bool {
        matches!(self, EntityKind::Program | EntityKind::Namespace)
    }

    /// Members owned directly by a class
    pub fn is_member(self) -> bool {
        matches!(self, EntityKind::Method | EntityKind::Attribute)
    }

    /// Anything with a body that carries a token stream
    pub fn is_callable(self) -> bool {
        matches!(self, EntityKind::Method | EntityKind::GlobalFunction)
    }

    /// Free functions and variables owned by a namespace or the program
    pub fn is_global(self) -> bool {
        matches!(self, EntityKind::GlobalFunction | EntityKind::GlobalVariable)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Program => "program",
            EntityKind::Namespace => "namespace",
            EntityKind::Class => "class",
            EntityKind::TemplateClass => "template class",
            EntityKind::TemplateSpecialization => "template specialization",
            EntityKind::Method => "method",
            EntityKind::Attribute => "attribute",
            EntityKind::GlobalFunction => "global function",
            EntityKind::GlobalVariable => "global variable",
        };
        f.write_str(s)
    }
}

/// Where an entity is declared
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclSpan {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line_start: u32,
    #[serde(default)]
    pub line_end: u32,
}

impl DeclSpan {
    pub fn new(file: &str, line_start: u32, line_end: u32) -> Self {
        Self {
            file: file.to_string(),
            line_start,
            line_end,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.file.is_empty() && self.line_start == 0 && self.line_end == 0
    }
}

/// Whether a comment documents a declaration or just sits in its body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommentRole {
    Documentation,
    #[default]
    Inline,
}

/// A comment span, already attributed to its lexical owner by the front end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentSpan {
    pub first_line: u32,
    pub last_line: u32,
    #[serde(default)]
    pub role: CommentRole,
}

impl CommentSpan {
    pub fn documentation(first_line: u32, last_line: u32) -> Self {
        Self {
            first_line,
            last_line,
            role: CommentRole::Documentation,
        }
    }

    pub fn inline(first_line: u32, last_line: u32) -> Self {
        Self {
            first_line,
            last_line,
            role: CommentRole::Inline,
        }
    }

    pub fn lines(&self) -> u32 {
        if self.last_line >= self.first_line {
            (self.last_line - self.first_line).saturating_add(1)
        } else {
            0
        }
    }
}

/// Pre-extracted line counts for one entity.
///
/// `logical_lines` excludes the bodies of nested local entities and
/// `comments` excludes spans owned by them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeInfo {
    #[serde(default)]
    pub logical_lines: u32,
    #[serde(default)]
    pub comments: Vec<CommentSpan>,
}

impl SizeInfo {
    pub fn new(logical_lines: u32) -> Self {
        Self {
            logical_lines,
            comments: Vec::new(),
        }
    }

    pub fn with_comment(mut self, span: CommentSpan) -> Self {
        self.comments.push(span);
        self
    }

    /// Distinct comment lines; overlapping spans are counted once
    pub fn comment_lines(&self) -> u32 {
        let mut ranges: Vec<(u32, u32)> = self
            .comments
            .iter()
            .filter(|c| c.lines() > 0)
            .map(|c| (c.first_line, c.last_line))
            .collect();
        count_covered_lines(&mut ranges)
    }

    /// Lines of comments documenting this declaration
    pub fn documentation_lines(&self) -> u32 {
        let mut ranges: Vec<(u32, u32)> = self
            .comments
            .iter()
            .filter(|c| c.role == CommentRole::Documentation && c.lines() > 0)
            .map(|c| (c.first_line, c.last_line))
            .collect();
        count_covered_lines(&mut ranges)
    }

    pub fn is_empty(&self) -> bool {
        self.logical_lines == 0 && self.comments.is_empty()
    }
}

/// Lines covered by the union of inclusive ranges, saturating at `u32::MAX`
fn count_covered_lines(ranges: &mut [(u32, u32)]) -> u32 {
    ranges.sort_unstable();
    let mut total: u32 = 0;
    let mut current: Option<(u32, u32)> = None;
    for &(start, end) in ranges.iter() {
        current = match current {
            Some((s, e)) if start <= e.saturating_add(1) => Some((s, e.max(end))),
            Some((s, e)) => {
                total = total.saturating_add((e - s).saturating_add(1));
                Some((start, end))
            }
            None => Some((start, end)),
        };
    }
    if let Some((s, e)) = current {
        total = total.saturating_add((e - s).saturating_add(1));
    }
    total
}

/// An entity in the semantic model
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: StrKey,
    pub qualified_name: StrKey,
    /// Enclosing scope; `None` only for the program root
    pub scope: Option<EntityId>,
    pub span: DeclSpan,
    pub is_static: bool,
    /// Class declared inside a method body or used only inside its enclosing class
    pub is_local: bool,
    pub size: SizeInfo,
    pub lexical: Option<LexicalStream>,
}

impl Entity {
    /// Fold a redeclaration of the same qualified name into this entity.
    /// Later non-empty data wins; flags accumulate.
    pub(crate) fn merge(&mut self, decl: EntityDecl) {
        if decl.kind != self.kind {
            self.kind = decl.kind;
        }
        if !decl.span.is_empty() {
            self.span = decl.span;
        }
        if !decl.size.is_empty() {
            self.size = decl.size;
        }
        if decl.lexical.as_ref().is_some_and(|l| !l.is_empty()) {
            self.lexical = decl.lexical;
        }
        self.is_static |= decl.is_static;
        self.is_local |= decl.is_local;
    }
}

/// Declaration of an entity before it gets an id
#[derive(Debug, Clone)]
pub struct EntityDecl {
    pub kind: EntityKind,
    pub qualified_name: String,
    pub name: Option<String>,
    pub scope: Option<EntityId>,
    pub span: DeclSpan,
    pub is_static: bool,
    pub is_local: bool,
    pub size: SizeInfo,
    pub lexical: Option<LexicalStream>,
}

impl EntityDecl {
    pub fn new(kind: EntityKind, qualified_name: &str) -> Self {
        Self {
            kind,
            qualified_name: qualified_name.to_string(),
            name: None,
            scope: None,
            span: DeclSpan::default(),
            is_static: false,
            is_local: false,
            size: SizeInfo::default(),
            lexical: None,
        }
    }

    pub fn namespace(qualified_name: &str) -> Self {
        Self::new(EntityKind::Namespace, qualified_name)
    }

    pub fn class(qualified_name: &str) -> Self {
        Self::new(EntityKind::Class, qualified_name)
    }

    pub fn method(qualified_name: &str) -> Self {
        Self::new(EntityKind::Method, qualified_name)
    }

    pub fn attribute(qualified_name: &str) -> Self {
        Self::new(EntityKind::Attribute, qualified_name)
    }

    pub fn global_function(qualified_name: &str) -> Self {
        Self::new(EntityKind::GlobalFunction, qualified_name)
    }

    pub fn global_variable(qualified_name: &str) -> Self {
        Self::new(EntityKind::GlobalVariable, qualified_name)
    }

    pub fn in_scope(mut self, scope: EntityId) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_span(mut self, span: DeclSpan) -> Self {
        self.span = span;
        self
    }

    pub fn with_size(mut self, size: SizeInfo) -> Self {
        self.size = size;
        self
    }

    pub fn with_tokens(mut self, lexical: LexicalStream) -> Self {
        self.lexical = Some(lexical);
        self
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn local(mut self) -> Self {
        self.is_local = true;
        self
    }

    /// Simple name: explicit, or the last `::` segment of the qualified name
    pub fn simple_name(&self) -> &str {
        match &self.name {
            Some(n) => n,
            None => self
                .qualified_name
                .rsplit("::")
                .next()
                .unwrap_or(&self.qualified_name),
        }
    }
}

/// Relation kinds between entities
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeKind {
    Inherits,
    Calls,
    AccessesAttribute,
    HasType,
    Instantiates,
    Returns,
    Throws,
    CanThrow,
    Uses,
    Parameter,
    HasArgument,
    TypedefAliases,
}

/// Edge weight: a relation kind plus how many times it occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub kind: EdgeKind,
    pub multiplicity: u32,
}

/// Borrow-free view of one edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeView {
    pub source: EntityId,
    pub target: EntityId,
    pub kind: EdgeKind,
    pub multiplicity: u32,
}
