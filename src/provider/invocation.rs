use crate::provider::{
    resolve_anthropic_model, InvocationSpec, ProviderError, ProviderKind, ProviderRequest,
    RunnerBinaries,
};

/// Every reconstruction step is a fresh, single-shot session.
pub fn build_invocation(
    request: &ProviderRequest,
    binaries: &RunnerBinaries,
) -> Result<InvocationSpec, ProviderError> {
    match request.provider {
        ProviderKind::Anthropic => {
            let model = resolve_anthropic_model(&request.model)?;
            let args = vec![
                "--dangerously-skip-permissions".to_string(),
                "--model".to_string(),
                model.clone(),
                "--output-format".to_string(),
                "json".to_string(),
                "-p".to_string(),
                request.message.clone(),
            ];
            Ok(InvocationSpec {
                binary: binaries.anthropic.clone(),
                args,
                resolved_model: model,
            })
        }
        ProviderKind::OpenAi => {
            let args = vec![
                "exec".to_string(),
                "--model".to_string(),
                request.model.clone(),
                "--skip-git-repo-check".to_string(),
                "--dangerously-bypass-approvals-and-sandbox".to_string(),
                "--json".to_string(),
                request.message.clone(),
            ];
            Ok(InvocationSpec {
                binary: binaries.openai.clone(),
                args,
                resolved_model: request.model.clone(),
            })
        }
    }
}
