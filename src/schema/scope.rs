use crate::schema::parser::{SchemaEntity, SchemaTable};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelection {
    All,
    Only(Vec<String>),
}

impl FieldSelection {
    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(fields.into_iter().map(Into::into).collect())
    }

    fn allows(&self, field: &str) -> bool {
        match self {
            FieldSelection::All => true,
            FieldSelection::Only(fields) => fields.iter().any(|name| name == field),
        }
    }
}

/// Breadth-first closure over entity dependencies, starting from `targets`.
pub fn dependency_closure(table: &SchemaTable, targets: &[String]) -> BTreeSet<String> {
    let mut resolved = BTreeSet::new();
    let mut queue = targets.iter().cloned().collect::<VecDeque<_>>();
    while let Some(current) = queue.pop_front() {
        if resolved.contains(&current) {
            continue;
        }
        let Some(entity) = table.entity(&current) else {
            continue;
        };
        resolved.insert(current);
        for dependency in &entity.dependencies {
            if !resolved.contains(dependency) {
                queue.push_back(dependency.clone());
            }
        }
    }
    resolved
}

pub(crate) fn render_entities<F>(table: &SchemaTable, mut include: F) -> String
where
    F: FnMut(&SchemaEntity) -> bool,
{
    table
        .entities()
        .iter()
        .filter(|entity| include(entity))
        .map(|entity| table.line_range(entity.span.start, entity.span.end))
        .collect::<Vec<_>>()
        .join("\n\n")
        .trim()
        .to_string()
}

pub(crate) fn render_filtered(
    table: &SchemaTable,
    selections: &BTreeMap<String, FieldSelection>,
) -> String {
    let mut blocks = Vec::new();
    for entity in table.entities() {
        let Some(selection) = selections.get(&entity.name) else {
            continue;
        };
        if entity.fields.is_empty() || *selection == FieldSelection::All {
            blocks.push(table.line_range(entity.span.start, entity.span.end));
            continue;
        }

        let mut lines = vec![table.line_range(entity.span.start, entity.header_end)];
        for field in &entity.fields {
            if selection.allows(&field.name) {
                lines.push(table.line_range(field.span.start, field.span.end));
            }
        }
        let last_field_end = entity
            .fields
            .last()
            .map(|field| field.span.end)
            .unwrap_or(entity.header_end);
        lines.push(table.line_range(last_field_end + 1, entity.span.end));
        blocks.push(lines.join("\n"));
    }
    blocks.join("\n\n").trim().to_string()
}
