//! Structural schema scoping.
//!
//! The schema is written in a small Rust-flavoured dialect: `struct` and `enum` items, one
//! field or variant per line, with `///` docs and `#[...]` attributes. Field types may wrap
//! other entities in `Option<..>`, collections (`Vec<..>`, maps, arrays, tuples) or unions
//! (`A | B`). Every step of a reconstruction run receives only the slice of the schema it
//! is allowed to produce.

mod fallback;
mod lexer;
mod parser;
mod scope;

pub use parser::{EntityKind, SchemaEntity, SchemaField, SchemaTable, TypeExpr};
pub use scope::{dependency_closure, FieldSelection};

use std::collections::BTreeMap;

pub const CASCADE_SCHEMA: &str = include_str!("assets/cascade.schema");

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("unexpected character `{ch}` on line {line}")]
    UnexpectedChar { ch: char, line: usize },
    #[error("unterminated {what} starting on line {line}")]
    Unterminated { what: &'static str, line: usize },
    #[error("expected {expected} on line {line}")]
    Unexpected { expected: String, line: usize },
    #[error("schema ended unexpectedly")]
    UnexpectedEnd,
    #[error("schema declares no entities")]
    NoEntities,
    #[error("entity `{0}` is declared more than once")]
    DuplicateEntity(String),
    #[error("`{entity}.{field}` shares line {line} with a neighbouring declaration")]
    SharedLine {
        entity: String,
        field: String,
        line: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeMode {
    All,
    Closure(Vec<String>),
}

impl ScopeMode {
    pub fn closure<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Closure(targets.into_iter().map(Into::into).collect())
    }
}

/// A parsed schema plus the source text it came from.
///
/// When the structured parse fails the scoper degrades to coarse block extraction: every
/// request then returns all recognizable entity blocks, unfiltered.
#[derive(Debug, Clone)]
pub struct SchemaScoper {
    source: String,
    table: Result<SchemaTable, SchemaError>,
}

impl SchemaScoper {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let table = SchemaTable::parse(&source);
        if let Err(err) = &table {
            tracing::warn!(error = %err, "schema parse failed; falling back to block extraction");
        }
        Self { source, table }
    }

    pub fn cascade() -> Self {
        Self::new(CASCADE_SCHEMA)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn table(&self) -> Option<&SchemaTable> {
        self.table.as_ref().ok()
    }

    pub fn parse_error(&self) -> Option<&SchemaError> {
        self.table.as_ref().err()
    }

    pub fn scope(&self, mode: &ScopeMode) -> String {
        let Ok(table) = &self.table else {
            return fallback::extract_entity_blocks(&self.source);
        };
        match mode {
            ScopeMode::All => scope::render_entities(table, |_| true),
            ScopeMode::Closure(targets) => {
                let reachable = dependency_closure(table, targets);
                scope::render_entities(table, |entity| reachable.contains(&entity.name))
            }
        }
    }

    pub fn filter_fields(&self, selections: &BTreeMap<String, FieldSelection>) -> String {
        let Ok(table) = &self.table else {
            return fallback::extract_entity_blocks(&self.source);
        };
        scope::render_filtered(table, selections)
    }
}

/// One-shot form of [`SchemaScoper::scope`].
pub fn scope(schema_text: &str, mode: &ScopeMode) -> String {
    SchemaScoper::new(schema_text).scope(mode)
}
