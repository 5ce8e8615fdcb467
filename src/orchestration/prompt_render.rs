use crate::orchestration::error::OrchestratorError;
use crate::orchestration::step::StepKind;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedInstructions {
    pub system: String,
    pub user: String,
}

fn render_template_with_placeholders<F>(
    template: &str,
    mut resolve: F,
) -> Result<String, String>
where
    F: FnMut(&str) -> Result<String, String>,
{
    let mut rendered = String::new();
    let mut cursor = template;

    while let Some(start) = cursor.find("{{") {
        rendered.push_str(&cursor[..start]);
        let after_open = &cursor[start + 2..];
        let Some(close_offset) = after_open.find("}}") else {
            return Err("unclosed placeholder in template".to_string());
        };
        let token = after_open[..close_offset].trim();
        if token.is_empty() {
            return Err("empty placeholder in template".to_string());
        }
        rendered.push_str(&resolve(token)?);
        cursor = &after_open[close_offset + 2..];
    }

    rendered.push_str(cursor);
    Ok(rendered)
}

/// Substitutes `{{Name}}` placeholders. Inserted values are not rescanned.
pub fn render_variables(
    template: &str,
    variables: &BTreeMap<String, String>,
) -> Result<String, String> {
    render_template_with_placeholders(template, |token| {
        variables
            .get(token)
            .cloned()
            .ok_or_else(|| format!("missing variable `{{{{{token}}}}}`"))
    })
}

pub fn render_step_instructions(
    step: StepKind,
    system_template: &str,
    user_template: &str,
    variables: &BTreeMap<String, String>,
) -> Result<RenderedInstructions, OrchestratorError> {
    let render = |template: &str| {
        render_variables(template, variables).map_err(|reason| {
            OrchestratorError::PromptRender {
                step: step.to_string(),
                reason,
            }
        })
    };
    Ok(RenderedInstructions {
        system: render(system_template)?,
        user: render(user_template)?,
    })
}
