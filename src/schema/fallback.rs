use regex::Regex;
use std::sync::OnceLock;

fn entity_start_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*(?:pub(?:\([^)\n]*\))?[ \t]+)?(?:struct|enum)[ \t]+[A-Za-z_]\w*")
            .expect("valid entity start regex")
    })
}

/// Coarse extraction used when the schema cannot be parsed: every block that starts
/// with a `struct`/`enum` declaration, running up to the next declaration.
pub(crate) fn extract_entity_blocks(source: &str) -> String {
    let starts = entity_start_pattern()
        .find_iter(source)
        .map(|found| found.start())
        .collect::<Vec<_>>();
    starts
        .iter()
        .enumerate()
        .map(|(idx, start)| {
            let end = starts.get(idx + 1).copied().unwrap_or(source.len());
            source[*start..end].trim()
        })
        .filter(|block| !block.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
