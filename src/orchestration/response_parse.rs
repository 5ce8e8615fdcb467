use crate::orchestration::error::OrchestratorError;
use crate::orchestration::step::StepKind;
use serde_json::Value;

/// Removes a surrounding markdown code fence, with or without a language tag.
/// A missing closing fence keeps everything after the opening one.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after_open = &trimmed[start + 3..];
    let body_start = after_open.find('\n').map(|n| n + 1).unwrap_or(0);
    let body = &after_open[body_start..];
    match body.find("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Start and end byte offsets of every balanced `{..}` / `[..]` span, ignoring brackets
/// inside JSON strings.
fn balanced_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut in_string = false;
    let mut escape_next = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            if escape_next {
                escape_next = false;
            } else if ch == '\\' {
                escape_next = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' if !stack.is_empty() => in_string = true,
            '{' | '[' => stack.push((ch, idx)),
            '}' | ']' => {
                let open = if ch == '}' { '{' } else { '[' };
                match stack.last() {
                    Some((candidate, start)) if *candidate == open => {
                        spans.push((*start, idx + 1));
                        stack.pop();
                    }
                    _ => stack.clear(),
                }
            }
            _ => {}
        }
    }
    spans
}

/// Decodes the longest balanced bracketed substring that is valid JSON.
pub fn extract_json_payload(text: &str) -> Option<Value> {
    let mut spans = balanced_spans(text);
    spans.sort_by(|a, b| (b.1 - b.0).cmp(&(a.1 - a.0)).then(a.0.cmp(&b.0)));
    spans
        .into_iter()
        .find_map(|(start, end)| serde_json::from_str(&text[start..end]).ok())
}

pub fn parse_response(step: StepKind, text: &str) -> Result<Value, OrchestratorError> {
    let stripped = strip_code_fence(text);
    if let Ok(value) = serde_json::from_str::<Value>(stripped) {
        return Ok(value);
    }
    if let Some(value) = extract_json_payload(text) {
        tracing::debug!(step = %step, "decoded payload from embedded json span");
        return Ok(value);
    }
    Err(OrchestratorError::Parse {
        step: step.to_string(),
        reason: format!(
            "no decodable json object or array in response ({} bytes)",
            text.len()
        ),
    })
}
