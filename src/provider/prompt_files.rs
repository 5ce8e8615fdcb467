use crate::provider::{io_error, PromptArtifacts, ProviderError};
use std::fs;
use std::path::Path;

pub const PROMPTS_DIR: &str = "provider_prompts";

/// Writes the instructions of one request next to each other so the CLI can read them.
pub fn write_file_backed_prompt(
    workspace: &Path,
    request_id: &str,
    system_instruction: &str,
    user_instruction: &str,
) -> Result<PromptArtifacts, ProviderError> {
    let prompt_dir = workspace.join(PROMPTS_DIR);
    fs::create_dir_all(&prompt_dir).map_err(|err| io_error(&prompt_dir, err))?;

    let system_file = prompt_dir.join(format!("{request_id}_system.md"));
    let user_file = prompt_dir.join(format!("{request_id}_user.md"));

    fs::write(&system_file, system_instruction).map_err(|err| io_error(&system_file, err))?;
    fs::write(&user_file, user_instruction).map_err(|err| io_error(&user_file, err))?;

    Ok(PromptArtifacts {
        system_file,
        user_file,
    })
}

pub fn file_backed_message(artifacts: &PromptArtifacts) -> String {
    format!(
        "Read your instructions from {} and the task from {}. Reply exactly as the instructions require.",
        artifacts.system_file.display(),
        artifacts.user_file.display()
    )
}
