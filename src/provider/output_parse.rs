use crate::provider::{ProviderError, ProviderKind};
use serde_json::Value;

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// `claude -p --output-format json` prints one result envelope; plain text is accepted too.
pub(crate) fn parse_anthropic_output(stdout: &str) -> Result<String, ProviderError> {
    let failure = |reason: &str| ProviderError::ParseFailure {
        provider: ProviderKind::Anthropic,
        reason: reason.to_string(),
        log: None,
    };
    let Some(trimmed) = non_empty(stdout) else {
        return Err(failure("stdout was empty"));
    };
    let Ok(Value::Object(envelope)) = serde_json::from_str::<Value>(&trimmed) else {
        return Ok(trimmed);
    };
    if envelope.get("type").and_then(Value::as_str) != Some("result") {
        return Ok(trimmed);
    }
    if envelope.get("is_error").and_then(Value::as_bool) == Some(true) {
        return Err(failure("result envelope reported an error"));
    }
    envelope
        .get("result")
        .and_then(Value::as_str)
        .and_then(non_empty)
        .ok_or_else(|| failure("result envelope has no text"))
}

fn extract_agent_message(item: &Value) -> Option<String> {
    for key in ["text", "message"] {
        if let Some(text) = item.get(key).and_then(Value::as_str).and_then(non_empty) {
            return Some(text);
        }
    }

    match item.get("content")? {
        Value::String(text) => non_empty(text),
        Value::Array(entries) => {
            let lines = entries
                .iter()
                .filter_map(|entry| entry.get("text").and_then(Value::as_str))
                .filter_map(non_empty)
                .collect::<Vec<_>>();
            (!lines.is_empty()).then(|| lines.join("\n"))
        }
        _ => None,
    }
}

/// Returns the last completed agent message of a `codex exec --json` event stream.
pub fn parse_openai_jsonl(stdout: &str) -> Result<String, ProviderError> {
    let mut last_message = None;

    for line in stdout.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let value: Value =
            serde_json::from_str(line).map_err(|err| ProviderError::ParseFailure {
                provider: ProviderKind::OpenAi,
                reason: format!("invalid jsonl event: {err}"),
                log: None,
            })?;

        if value.get("type").and_then(Value::as_str) != Some("item.completed") {
            continue;
        }
        let Some(item) = value.get("item") else {
            continue;
        };
        if item.get("type").and_then(Value::as_str) != Some("agent_message") {
            continue;
        }
        if let Some(message) = extract_agent_message(item) {
            last_message = Some(message);
        }
    }

    last_message.ok_or_else(|| ProviderError::ParseFailure {
        provider: ProviderKind::OpenAi,
        reason: "missing terminal agent_message item.completed event".to_string(),
        log: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anthropic_result_envelope_is_unwrapped() {
        let stdout = r#"{"type":"result","is_error":false,"result":"{\"a\":1}"}"#;
        assert_eq!(parse_anthropic_output(stdout).expect("text"), "{\"a\":1}");
    }

    #[test]
    fn anthropic_plain_json_payload_passes_through() {
        let stdout = "{\"event_id\": \"EV\"}\n";
        assert_eq!(
            parse_anthropic_output(stdout).expect("text"),
            "{\"event_id\": \"EV\"}"
        );
    }

    #[test]
    fn anthropic_error_envelope_fails() {
        let stdout = r#"{"type":"result","is_error":true,"result":"quota"}"#;
        assert!(parse_anthropic_output(stdout).is_err());
        assert!(parse_anthropic_output("  \n").is_err());
    }
}
