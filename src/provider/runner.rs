use crate::provider::invocation::build_invocation;
use crate::provider::output_parse::parse_anthropic_output;
use crate::provider::{
    io_error, parse_openai_jsonl, InvocationLog, ProviderError, ProviderKind, ProviderRequest,
    ProviderResult,
};
use std::io::{BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerBinaries {
    pub anthropic: String,
    pub openai: String,
}

impl Default for RunnerBinaries {
    fn default() -> Self {
        Self {
            anthropic: "claude".to_string(),
            openai: "codex".to_string(),
        }
    }
}

impl RunnerBinaries {
    pub fn for_provider(&self, provider: ProviderKind) -> &str {
        match provider {
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::OpenAi => &self.openai,
        }
    }
}

enum Outcome {
    Exited(ExitStatus),
    TimedOut(ExitStatus),
}

fn drain<R: Read + Send + 'static>(pipe: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        let _ = BufReader::new(pipe).read_to_string(&mut buf);
        buf
    })
}

fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
    request: &ProviderRequest,
) -> Result<Outcome, ProviderError> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Outcome::Exited(status)),
            Ok(None) if start.elapsed() > timeout => {
                let _ = child.kill();
                let status = child.wait().map_err(|e| io_error(&request.cwd, e))?;
                return Ok(Outcome::TimedOut(status));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(err) => return Err(io_error(&request.cwd, err)),
        }
    }
}

/// Runs one provider CLI invocation to completion, killing it after `request.timeout`.
pub fn run_provider(
    request: &ProviderRequest,
    binaries: &RunnerBinaries,
) -> Result<ProviderResult, ProviderError> {
    let spec = build_invocation(request, binaries)?;

    let mut log = InvocationLog {
        request_id: request.request_id.clone(),
        provider: request.provider,
        model: spec.resolved_model.clone(),
        command_form: format!("{} {}", spec.binary, spec.args.join(" ")),
        working_directory: request.cwd.clone(),
        system_file: request.prompt_artifacts.system_file.clone(),
        user_file: request.prompt_artifacts.user_file.clone(),
        exit_code: None,
        timed_out: false,
    };
    tracing::debug!(
        request_id = %request.request_id,
        provider = %request.provider,
        model = %spec.resolved_model,
        "spawning provider process"
    );

    let mut command = Command::new(&spec.binary);
    command
        .current_dir(&request.cwd)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (k, v) in &request.env_overrides {
        command.env(k, v);
    }

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ProviderError::MissingBinary {
                provider: request.provider,
                binary: spec.binary,
                log: Box::new(log),
            })
        }
        Err(err) => return Err(io_error(&request.cwd, err)),
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io_error(&request.cwd, std::io::Error::other("missing stdout pipe")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io_error(&request.cwd, std::io::Error::other("missing stderr pipe")))?;
    let stdout_reader = drain(stdout);
    let stderr_reader = drain(stderr);

    let outcome = wait_with_timeout(&mut child, request.timeout, request)?;
    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();

    let status = match outcome {
        Outcome::Exited(status) => status,
        Outcome::TimedOut(status) => {
            tracing::warn!(
                request_id = %request.request_id,
                timeout_ms = request.timeout.as_millis() as u64,
                "provider process timed out"
            );
            log.timed_out = true;
            log.exit_code = status.code();
            return Err(ProviderError::Timeout {
                provider: request.provider,
                timeout_ms: request.timeout.as_millis() as u64,
                log: Box::new(log),
            });
        }
    };
    log.exit_code = status.code();

    if !status.success() {
        return Err(ProviderError::NonZeroExit {
            provider: request.provider,
            exit_code: status.code().unwrap_or(-1),
            stderr,
            log: Box::new(log),
        });
    }

    let parsed = match request.provider {
        ProviderKind::Anthropic => parse_anthropic_output(&stdout),
        ProviderKind::OpenAi => parse_openai_jsonl(&stdout),
    };
    let message = parsed.map_err(|err| match err {
        ProviderError::ParseFailure {
            provider, reason, ..
        } => ProviderError::ParseFailure {
            provider,
            reason,
            log: Some(Box::new(log.clone())),
        },
        other => other,
    })?;

    Ok(ProviderResult { message, log })
}
