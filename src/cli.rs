use crate::cascade::{BuildInput, DataSample};
use crate::config::{load_settings, resolve_runner_binaries, Settings};
use crate::orchestration::{integrate_from_checkpoints, timestamped_run_dir, WorkflowEngine};
use crate::prompts::PromptSet;
use crate::provider::CliGenerator;
use crate::schema::{FieldSelection, SchemaScoper, ScopeMode};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const USAGE: &str = "usage:
  cascade run (--input <build_input.json> | --query <text> --sample <file>... [--keyword <k>]...) [--config <cascade.yaml>] [--verbose]
  cascade integrate <checkpoint_dir> [--output <file>] [--verbose]
  cascade schema [--schema <file>] [--closure <Entity,...> | --fields <Entity[=field,...]>...]";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunArgs {
    pub config: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub query: Option<String>,
    pub keywords: Vec<String>,
    pub samples: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaView {
    Scope(ScopeMode),
    Fields(BTreeMap<String, FieldSelection>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(RunArgs),
    Integrate {
        dir: PathBuf,
        output: Option<PathBuf>,
    },
    Schema {
        schema: Option<PathBuf>,
        view: SchemaView,
    },
    Help,
}

pub fn is_verbose(args: &[String]) -> bool {
    args.iter().any(|arg| arg == "--verbose" || arg == "-v")
}

fn flag_value<'a>(
    flag: &str,
    iter: &mut impl Iterator<Item = &'a String>,
) -> Result<String, String> {
    iter.next()
        .cloned()
        .ok_or_else(|| format!("`{flag}` requires a value\n{USAGE}"))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut iter = args
        .iter()
        .filter(|arg| arg.as_str() != "--verbose" && arg.as_str() != "-v");
    let Some(command) = iter.next() else {
        return Ok(Command::Help);
    };
    match command.as_str() {
        "help" | "--help" | "-h" => Ok(Command::Help),
        "run" => {
            let mut run = RunArgs::default();
            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "--config" => run.config = Some(flag_value(arg, &mut iter)?.into()),
                    "--input" => run.input = Some(flag_value(arg, &mut iter)?.into()),
                    "--query" => run.query = Some(flag_value(arg, &mut iter)?),
                    "--keyword" => run.keywords.push(flag_value(arg, &mut iter)?),
                    "--sample" => run.samples.push(flag_value(arg, &mut iter)?.into()),
                    other => return Err(format!("unknown argument `{other}`\n{USAGE}")),
                }
            }
            if run.input.is_none() && run.query.is_none() {
                return Err(format!("`run` needs `--input` or `--query`\n{USAGE}"));
            }
            Ok(Command::Run(run))
        }
        "integrate" => {
            let mut dir = None;
            let mut output = None;
            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "--output" => output = Some(flag_value(arg, &mut iter)?.into()),
                    other if other.starts_with("--") => {
                        return Err(format!("unknown argument `{other}`\n{USAGE}"))
                    }
                    other if dir.is_none() => dir = Some(PathBuf::from(other)),
                    other => return Err(format!("unexpected argument `{other}`\n{USAGE}")),
                }
            }
            let dir = dir.ok_or_else(|| format!("`integrate` needs a directory\n{USAGE}"))?;
            Ok(Command::Integrate { dir, output })
        }
        "schema" => {
            let mut schema = None;
            let mut closure: Option<Vec<String>> = None;
            let mut fields = BTreeMap::new();
            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "--schema" => schema = Some(flag_value(arg, &mut iter)?.into()),
                    "--closure" => {
                        closure
                            .get_or_insert_with(Vec::new)
                            .extend(split_list(&flag_value(arg, &mut iter)?));
                    }
                    "--fields" => {
                        let raw = flag_value(arg, &mut iter)?;
                        let (entity, selection) = match raw.split_once('=') {
                            Some((entity, list)) => {
                                (entity.trim(), FieldSelection::Only(split_list(list)))
                            }
                            None => (raw.trim(), FieldSelection::All),
                        };
                        fields.insert(entity.to_string(), selection);
                    }
                    other => return Err(format!("unknown argument `{other}`\n{USAGE}")),
                }
            }
            let view = match (closure, fields.is_empty()) {
                (Some(_), false) => {
                    return Err(format!(
                        "`--closure` and `--fields` cannot be combined\n{USAGE}"
                    ))
                }
                (Some(targets), true) => SchemaView::Scope(ScopeMode::Closure(targets)),
                (None, false) => SchemaView::Fields(fields),
                (None, true) => SchemaView::Scope(ScopeMode::All),
            };
            Ok(Command::Schema { schema, view })
        }
        other => Err(format!("unknown command `{other}`\n{USAGE}")),
    }
}

fn read_text(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|err| format!("failed to read {}: {err}", path.display()))
}

pub fn build_input_from_args(run: &RunArgs) -> Result<BuildInput, String> {
    let mut input = match &run.input {
        Some(path) => serde_json::from_str::<BuildInput>(&read_text(path)?)
            .map_err(|err| format!("invalid build input {}: {err}", path.display()))?,
        None => BuildInput::new(String::new(), Vec::new(), Vec::new()),
    };
    if let Some(query) = &run.query {
        input.query = query.clone();
    }
    input.keywords.extend(run.keywords.iter().cloned());
    for path in &run.samples {
        input.samples.push(DataSample {
            source: Some(path.display().to_string()),
            content: read_text(path)?,
        });
    }
    Ok(input)
}

fn scoper_for(settings_schema: Option<String>) -> SchemaScoper {
    match settings_schema {
        Some(text) => SchemaScoper::new(text),
        None => SchemaScoper::cascade(),
    }
}

fn run_reconstruction(run: &RunArgs) -> Result<String, String> {
    let settings: Settings = load_settings(run.config.as_deref()).map_err(|e| e.to_string())?;
    let input = build_input_from_args(run)?;
    let scoper = scoper_for(settings.load_schema_text().map_err(|e| e.to_string())?);
    let prompts = match &settings.prompts_dir {
        Some(dir) => PromptSet::with_overrides(dir).map_err(|e| e.to_string())?,
        None => PromptSet::default(),
    };

    let run_dir = timestamped_run_dir(&settings.save_folder, chrono::Utc::now());
    let generator = CliGenerator::new(
        settings.provider_kind().map_err(|e| e.to_string())?,
        settings.model.clone(),
        resolve_runner_binaries(&settings, |key| std::env::var(key).ok()),
        run_dir.join("provider"),
        settings.step_timeout(),
    );
    let summary = WorkflowEngine::new(&generator, &scoper, &prompts)
        .with_max_total_steps(settings.max_total_steps)
        .run(input, &run_dir)
        .map_err(|e| e.to_string())?;

    let recovery = if summary.recovered.is_some() {
        "recovery check passed"
    } else {
        "recovery check skipped: checkpoints could not be recovered"
    };
    Ok(format!(
        "reconstruction complete\nrun_dir={}\nsteps={}\nstages={}\nepisodes={}\n{recovery}",
        summary.run_dir.display(),
        summary.state.log().len(),
        summary.cascade.stage_count(),
        summary.cascade.episode_count(),
    ))
}

fn run_integrate(dir: &Path, output: Option<&Path>) -> Result<String, String> {
    let cascade = integrate_from_checkpoints(dir).map_err(|e| e.to_string())?;
    let body = serde_json::to_string_pretty(&cascade).map_err(|e| e.to_string())?;
    match output {
        Some(path) => {
            crate::shared::fs_atomic::atomic_write_file(path, format!("{body}\n").as_bytes())
                .map_err(|err| format!("failed to write {}: {err}", path.display()))?;
            Ok(format!(
                "integrated {} stages and {} episodes into {}",
                cascade.stage_count(),
                cascade.episode_count(),
                path.display()
            ))
        }
        None => Ok(body),
    }
}

fn run_schema(schema: Option<&Path>, view: &SchemaView) -> Result<String, String> {
    let scoper = scoper_for(schema.map(read_text).transpose()?);
    Ok(match view {
        SchemaView::Scope(mode) => scoper.scope(mode),
        SchemaView::Fields(fields) => scoper.filter_fields(fields),
    })
}

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    match parse_args(&args)? {
        Command::Help => Ok(USAGE.to_string()),
        Command::Run(run) => run_reconstruction(&run),
        Command::Integrate { dir, output } => run_integrate(&dir, output.as_deref()),
        Command::Schema { schema, view } => run_schema(schema.as_deref(), &view),
    }
}
