//! Pre-tokenized bodies for lexical complexity
//!
//! The front end tags each token of a method/function (signature included) as
//! an operator or an operand. Operand identity is the resolved declaration,
//! never the spelling: a parameter that reuses an outer variable's name gets
//! its own declaration id and therefore counts as a distinct operand.

use serde::{Deserialize, Serialize};

/// Cast forms; each one is a separate operator kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastKind {
    /// `(T)expr`
    CStyle,
    /// `T(expr)`
    Functional,
    /// checked, `dynamic_cast`
    Dynamic,
    /// unchecked, `reinterpret_cast`
    Reinterpret,
    /// mutability-stripping, `const_cast`
    Const,
    /// value-narrowing, `static_cast`
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    /// A `{ }` pair
    Block,
    /// A statement terminator
    Statement,
}

/// Operator token. Two tokens are the same operator kind iff they compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Control flow, declaration and literal keywords (`if`, `case`, `const`, `enum`, `true`, ...)
    Keyword(String),
    Cast(CastKind),
    /// Punctuation used as an operator (`=`, `==`, `++`, `::`, `<>`, `->`, `()`, ...)
    Punctuation(String),
    Delimiter(Delimiter),
}

/// How an operand occurrence resolves
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binding {
    /// Resolved to a declaration; the id is unique per declared entity
    Declaration(u32),
    /// A literal; identical spellings are the same operand
    Literal,
    /// Not resolved by the front end; identity falls back to spelling within the scope
    Unresolved { scope: u32 },
}

impl Default for Binding {
    fn default() -> Self {
        Binding::Unresolved { scope: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operand {
    pub spelling: String,
    #[serde(default)]
    pub binding: Binding,
}

/// Identity used to count distinct operands
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperandKey {
    Declaration(u32),
    Literal(String),
    Unresolved(u32, String),
}

impl Operand {
    pub fn key(&self) -> OperandKey {
        match &self.binding {
            Binding::Declaration(id) => OperandKey::Declaration(*id),
            Binding::Literal => OperandKey::Literal(self.spelling.clone()),
            Binding::Unresolved { scope } => OperandKey::Unresolved(*scope, self.spelling.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LexToken {
    Operator(Operator),
    Operand(Operand),
}

/// Token stream of one callable body plus its signature
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexicalStream {
    #[serde(default)]
    pub tokens: Vec<LexToken>,
}

impl LexicalStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn keyword(mut self, kw: &str) -> Self {
        self.tokens
            .push(LexToken::Operator(Operator::Keyword(kw.to_string())));
        self
    }

    pub fn cast(mut self, kind: CastKind) -> Self {
        self.tokens.push(LexToken::Operator(Operator::Cast(kind)));
        self
    }

    pub fn punct(mut self, symbol: &str) -> Self {
        self.tokens
            .push(LexToken::Operator(Operator::Punctuation(symbol.to_string())));
        self
    }

    pub fn block(mut self) -> Self {
        self.tokens
            .push(LexToken::Operator(Operator::Delimiter(Delimiter::Block)));
        self
    }

    pub fn statement(mut self) -> Self {
        self.tokens
            .push(LexToken::Operator(Operator::Delimiter(Delimiter::Statement)));
        self
    }

    /// Operand resolved to declaration `decl`
    pub fn name(mut self, spelling: &str, decl: u32) -> Self {
        self.tokens.push(LexToken::Operand(Operand {
            spelling: spelling.to_string(),
            binding: Binding::Declaration(decl),
        }));
        self
    }

    pub fn literal(mut self, spelling: &str) -> Self {
        self.tokens.push(LexToken::Operand(Operand {
            spelling: spelling.to_string(),
            binding: Binding::Literal,
        }));
        self
    }

    pub fn unresolved(mut self, spelling: &str, scope: u32) -> Self {
        self.tokens.push(LexToken::Operand(Operand {
            spelling: spelling.to_string(),
            binding: Binding::Unresolved { scope },
        }));
        self
    }
}
