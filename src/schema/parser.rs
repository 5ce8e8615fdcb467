use crate::schema::lexer::{tokenize, Token, TokenKind};
use crate::schema::SchemaError;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Struct,
    Enum,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Named { name: String, args: Vec<TypeExpr> },
    Tuple(Vec<TypeExpr>),
    Array(Box<TypeExpr>),
    Reference(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
}

impl TypeExpr {
    /// Every type name mentioned by the expression, wrappers included.
    pub fn referenced_names(&self, acc: &mut BTreeSet<String>) {
        match self {
            TypeExpr::Named { name, args } => {
                acc.insert(name.clone());
                for arg in args {
                    arg.referenced_names(acc);
                }
            }
            TypeExpr::Tuple(items) | TypeExpr::Union(items) => {
                for item in items {
                    item.referenced_names(acc);
                }
            }
            TypeExpr::Array(inner) | TypeExpr::Reference(inner) => inner.referenced_names(acc),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LineSpan {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    pub types: Vec<TypeExpr>,
    pub(crate) span: LineSpan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntity {
    pub name: String,
    pub kind: EntityKind,
    pub fields: Vec<SchemaField>,
    pub dependencies: BTreeSet<String>,
    pub(crate) span: LineSpan,
    pub(crate) header_end: usize,
}

impl SchemaEntity {
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaTable {
    entities: Vec<SchemaEntity>,
    lines: Vec<String>,
}

impl SchemaTable {
    pub fn parse(source: &str) -> Result<Self, SchemaError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens, pos: 0 };
        let mut entities = Vec::new();
        while !parser.at_end() {
            entities.push(parser.entity()?);
        }
        if entities.is_empty() {
            return Err(SchemaError::NoEntities);
        }

        let mut seen = BTreeSet::new();
        for entity in &entities {
            if !seen.insert(entity.name.clone()) {
                return Err(SchemaError::DuplicateEntity(entity.name.clone()));
            }
        }
        for entity in &mut entities {
            entity.dependencies = entity
                .dependencies
                .iter()
                .filter(|name| *name != &entity.name && seen.contains(*name))
                .cloned()
                .collect();
        }

        Ok(Self {
            entities,
            lines: source.lines().map(str::to_string).collect(),
        })
    }

    pub fn entities(&self) -> &[SchemaEntity] {
        &self.entities
    }

    pub fn entity(&self, name: &str) -> Option<&SchemaEntity> {
        self.entities.iter().find(|entity| entity.name == name)
    }

    pub(crate) fn line_range(&self, start: usize, end: usize) -> String {
        self.lines
            .get(start..=end.min(self.lines.len().saturating_sub(1)))
            .map(|lines| lines.join("\n"))
            .unwrap_or_default()
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Result<Token, SchemaError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(SchemaError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn last_line(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|idx| self.tokens.get(idx))
            .map(|token| token.line)
            .unwrap_or(0)
    }

    fn expect_punct(&mut self, ch: char) -> Result<Token, SchemaError> {
        let token = self.next()?;
        if token.is_punct(ch) {
            return Ok(token);
        }
        Err(unexpected(&token, &format!("`{ch}`")))
    }

    fn ident(&mut self) -> Result<String, SchemaError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Ident(name) => Ok(name),
            _ => Err(unexpected(&token, "identifier")),
        }
    }

    fn eat_punct(&mut self, ch: char) -> bool {
        if self.peek().is_some_and(|token| token.is_punct(ch)) {
            self.pos += 1;
            return true;
        }
        false
    }

    /// Doc comments and attributes in front of an item; returns the first line they occupy.
    fn leading_trivia(&mut self) -> Result<Option<usize>, SchemaError> {
        let mut first_line = None;
        loop {
            let Some(token) = self.peek() else {
                return Ok(first_line);
            };
            let line = token.line;
            if token.kind == TokenKind::Doc {
                self.pos += 1;
            } else if token.is_punct('#') {
                self.pos += 1;
                self.eat_punct('!');
                self.skip_group('[', ']')?;
            } else {
                return Ok(first_line);
            }
            first_line.get_or_insert(line);
        }
    }

    fn skip_group(&mut self, open: char, close: char) -> Result<(), SchemaError> {
        self.expect_punct(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            let token = self.next()?;
            if token.is_punct(open) {
                depth += 1;
            } else if token.is_punct(close) {
                depth -= 1;
            }
        }
        Ok(())
    }

    fn visibility(&mut self) -> Result<(), SchemaError> {
        if self.peek().is_some_and(|token| token.is_ident("pub")) {
            self.pos += 1;
            if self.peek().is_some_and(|token| token.is_punct('(')) {
                self.skip_group('(', ')')?;
            }
        }
        Ok(())
    }

    fn entity(&mut self) -> Result<SchemaEntity, SchemaError> {
        let trivia_line = self.leading_trivia()?;
        self.visibility()?;
        let keyword = self.next()?;
        let kind = if keyword.is_ident("struct") {
            EntityKind::Struct
        } else if keyword.is_ident("enum") {
            EntityKind::Enum
        } else {
            return Err(unexpected(&keyword, "`struct` or `enum`"));
        };
        let start = trivia_line.unwrap_or(keyword.line);
        let name = self.ident()?;
        if self.peek().is_some_and(|token| token.is_punct('<')) {
            self.skip_group('<', '>')?;
        }

        let mut dependencies = BTreeSet::new();
        if kind == EntityKind::Struct && self.eat_punct(';') {
            let line = self.last_line();
            return Ok(SchemaEntity {
                name,
                kind,
                fields: Vec::new(),
                dependencies,
                span: LineSpan { start, end: line },
                header_end: line,
            });
        }
        if kind == EntityKind::Struct && self.peek().is_some_and(|token| token.is_punct('(')) {
            for ty in self.tuple_fields()? {
                ty.referenced_names(&mut dependencies);
            }
            self.expect_punct(';')?;
            let line = self.last_line();
            return Ok(SchemaEntity {
                name,
                kind,
                fields: Vec::new(),
                dependencies,
                span: LineSpan { start, end: line },
                header_end: line,
            });
        }

        let open = self.expect_punct('{')?;
        let header_end = open.line;
        let mut fields = Vec::new();
        loop {
            if self.peek().is_some_and(|token| token.is_punct('}')) {
                break;
            }
            let field = match kind {
                EntityKind::Struct => self.struct_field()?,
                EntityKind::Enum => self.enum_variant()?,
            };
            let previous_end = fields
                .last()
                .map(|f: &SchemaField| f.span.end)
                .unwrap_or(header_end);
            if field.span.start <= previous_end {
                return Err(SchemaError::SharedLine {
                    entity: name.clone(),
                    field: field.name.clone(),
                    line: field.span.start + 1,
                });
            }
            for ty in &field.types {
                ty.referenced_names(&mut dependencies);
            }
            fields.push(field);
        }
        let close = self.expect_punct('}')?;
        if let Some(last) = fields.last() {
            if close.line <= last.span.end {
                return Err(SchemaError::SharedLine {
                    entity: name.clone(),
                    field: last.name.clone(),
                    line: close.line + 1,
                });
            }
        }

        Ok(SchemaEntity {
            name,
            kind,
            fields,
            dependencies,
            span: LineSpan {
                start,
                end: close.line,
            },
            header_end,
        })
    }

    fn struct_field(&mut self) -> Result<SchemaField, SchemaError> {
        let trivia_line = self.leading_trivia()?;
        self.visibility()?;
        let name_line = self.peek().map(|token| token.line).unwrap_or(0);
        let name = self.ident()?;
        self.expect_punct(':')?;
        let ty = self.type_expr()?;
        self.eat_punct(',');
        Ok(SchemaField {
            name,
            types: vec![ty],
            span: LineSpan {
                start: trivia_line.unwrap_or(name_line),
                end: self.last_line(),
            },
        })
    }

    fn enum_variant(&mut self) -> Result<SchemaField, SchemaError> {
        let trivia_line = self.leading_trivia()?;
        let name_line = self.peek().map(|token| token.line).unwrap_or(0);
        let name = self.ident()?;
        let mut types = Vec::new();
        if self.peek().is_some_and(|token| token.is_punct('(')) {
            types = self.tuple_fields()?;
        } else if self.eat_punct('{') {
            while !self.eat_punct('}') {
                self.leading_trivia()?;
                self.ident()?;
                self.expect_punct(':')?;
                types.push(self.type_expr()?);
                self.eat_punct(',');
            }
        } else if self.eat_punct('=') {
            self.eat_punct('-');
            let token = self.next()?;
            if token.kind != TokenKind::Number {
                return Err(unexpected(&token, "discriminant"));
            }
        }
        self.eat_punct(',');
        Ok(SchemaField {
            name,
            types,
            span: LineSpan {
                start: trivia_line.unwrap_or(name_line),
                end: self.last_line(),
            },
        })
    }

    fn tuple_fields(&mut self) -> Result<Vec<TypeExpr>, SchemaError> {
        self.expect_punct('(')?;
        let mut types = Vec::new();
        while !self.eat_punct(')') {
            self.visibility()?;
            types.push(self.type_expr()?);
            if !self.eat_punct(',') {
                self.expect_punct(')')?;
                break;
            }
        }
        Ok(types)
    }

    fn type_expr(&mut self) -> Result<TypeExpr, SchemaError> {
        let first = self.single_type()?;
        if !self.peek().is_some_and(|token| token.is_punct('|')) {
            return Ok(first);
        }
        let mut members = vec![first];
        while self.eat_punct('|') {
            members.push(self.single_type()?);
        }
        Ok(TypeExpr::Union(members))
    }

    fn single_type(&mut self) -> Result<TypeExpr, SchemaError> {
        let token = self.next()?;
        match &token.kind {
            TokenKind::Punct('(') => {
                let mut items = Vec::new();
                while !self.eat_punct(')') {
                    items.push(self.type_expr()?);
                    if !self.eat_punct(',') {
                        self.expect_punct(')')?;
                        break;
                    }
                }
                Ok(TypeExpr::Tuple(items))
            }
            TokenKind::Punct('[') => {
                let inner = self.type_expr()?;
                if self.eat_punct(';') {
                    let len = self.next()?;
                    if len.kind != TokenKind::Number {
                        return Err(unexpected(&len, "array length"));
                    }
                }
                self.expect_punct(']')?;
                Ok(TypeExpr::Array(Box::new(inner)))
            }
            TokenKind::Punct('&') => {
                if self.peek().is_some_and(|t| t.kind == TokenKind::Lifetime) {
                    self.pos += 1;
                }
                if self.peek().is_some_and(|t| t.is_ident("mut")) {
                    self.pos += 1;
                }
                Ok(TypeExpr::Reference(Box::new(self.single_type()?)))
            }
            TokenKind::Ident(first) => {
                let mut name = first.clone();
                while self.peek().is_some_and(|t| t.is_punct(':'))
                    && self.peek_at(1).is_some_and(|t| t.is_punct(':'))
                {
                    self.pos += 2;
                    name = self.ident()?;
                }
                let mut args = Vec::new();
                if self.eat_punct('<') {
                    while !self.eat_punct('>') {
                        if self.peek().is_some_and(|t| t.kind == TokenKind::Lifetime) {
                            self.pos += 1;
                        } else {
                            args.push(self.type_expr()?);
                        }
                        if !self.eat_punct(',') {
                            self.expect_punct('>')?;
                            break;
                        }
                    }
                }
                Ok(TypeExpr::Named { name, args })
            }
            _ => Err(unexpected(&token, "type")),
        }
    }
}

fn unexpected(token: &Token, expected: &str) -> SchemaError {
    SchemaError::Unexpected {
        expected: expected.to_string(),
        line: token.line + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrappers_resolve_to_underlying_entities() {
        let table = SchemaTable::parse(
            r#"
struct Leaf {
    value: String,
}

struct Holder {
    maybe: Option<Leaf>,
    many: Vec<Leaf>,
    keyed: std::collections::BTreeMap<String, Other>,
    either: Leaf | Other,
}

struct Other {
    flag: bool,
}
"#,
        )
        .expect("parse");

        let holder = table.entity("Holder").expect("holder");
        assert_eq!(holder.field_names(), vec!["maybe", "many", "keyed", "either"]);
        assert_eq!(
            holder.dependencies.iter().cloned().collect::<Vec<_>>(),
            vec!["Leaf".to_string(), "Other".to_string()]
        );
        assert!(table.entity("Leaf").expect("leaf").dependencies.is_empty());
    }

    #[test]
    fn enum_variants_contribute_dependencies() {
        let table = SchemaTable::parse(
            "enum Amount {\n    Exact(Money),\n    Range { low: Money, high: Money },\n    Unknown,\n}\n\nstruct Money {\n    units: i64,\n}\n",
        )
        .expect("parse");
        let amount = table.entity("Amount").expect("amount");
        assert_eq!(amount.kind, EntityKind::Enum);
        assert_eq!(amount.field_names(), vec!["Exact", "Range", "Unknown"]);
        assert!(amount.dependencies.contains("Money"));
    }

    #[test]
    fn self_references_are_not_dependencies() {
        let table =
            SchemaTable::parse("struct Node {\n    children: Vec<Node>,\n}\n").expect("parse");
        assert!(table.entity("Node").expect("node").dependencies.is_empty());
    }

    #[test]
    fn two_fields_on_one_line_are_rejected() {
        let err = SchemaTable::parse("struct A {\n    x: u8, y: u8,\n}\n").expect_err("fails");
        assert!(matches!(err, SchemaError::SharedLine { .. }));
    }

    #[test]
    fn duplicate_entities_are_rejected() {
        let err = SchemaTable::parse("struct A;\nstruct A;\n").expect_err("fails");
        assert!(matches!(err, SchemaError::DuplicateEntity(name) if name == "A"));
    }
}
