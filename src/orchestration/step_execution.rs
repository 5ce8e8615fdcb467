use crate::orchestration::checkpoint_store::{CheckpointStore, StepExchange};
use crate::orchestration::error::OrchestratorError;
use crate::orchestration::prompt_render::render_step_instructions;
use crate::orchestration::response_parse::parse_response;
use crate::orchestration::state::{StepResult, WorkflowState};
use crate::orchestration::step::{SchemaRequest, StepKind};
use crate::orchestration::step_context::StepContext;
use crate::prompts::PromptSet;
use crate::provider::GenerationService;
use crate::schema::SchemaScoper;

/// Runs single steps: scoped prompt, one generation call, parse, checkpoint, record.
pub struct StepExecutor<'a> {
    generator: &'a dyn GenerationService,
    scoper: &'a SchemaScoper,
    prompts: &'a PromptSet,
    store: &'a CheckpointStore,
}

impl<'a> StepExecutor<'a> {
    pub fn new(
        generator: &'a dyn GenerationService,
        scoper: &'a SchemaScoper,
        prompts: &'a PromptSet,
        store: &'a CheckpointStore,
    ) -> Self {
        Self {
            generator,
            scoper,
            prompts,
            store,
        }
    }

    pub fn scoped_schema(&self, step: StepKind) -> String {
        match step.schema_request() {
            SchemaRequest::Scope(mode) => self.scoper.scope(&mode),
            SchemaRequest::Fields(selections) => self.scoper.filter_fields(&selections),
        }
    }

    pub fn execute(
        &self,
        state: &mut WorkflowState,
        step: StepKind,
    ) -> Result<(), OrchestratorError> {
        let context = StepContext::build(state, step)?;
        let target = context.target();
        let sequence = state.next_sequence();

        let schema = self.scoped_schema(step);
        let variables = context.variables(state.input(), &schema)?;
        let prompt = self.prompts.get(step);
        let instructions =
            render_step_instructions(step, &prompt.system, &prompt.user, &variables)?;

        tracing::info!(
            step = %step,
            sequence,
            target = ?target,
            "executing reconstruction step"
        );
        let generation = self
            .generator
            .generate(&instructions.system, &instructions.user, &variables)
            .map_err(|source| OrchestratorError::Generation {
                step: step.to_string(),
                source,
            })?;
        let payload = parse_response(step, &generation.text)?;

        let exchange = StepExchange {
            step,
            sequence,
            target,
            instructions_sha256: StepExchange::instructions_digest(
                &instructions.system,
                &instructions.user,
            ),
            system_instruction: instructions.system,
            user_instruction: instructions.user,
            variables,
            raw_response: generation.text,
            recorded_at: chrono::Utc::now().to_rfc3339(),
        };
        let result_path = self.store.write_step(&exchange, &payload)?;
        tracing::debug!(step = %step, sequence, path = %result_path.display(), "checkpoint written");

        state.record(StepResult {
            step,
            sequence,
            payload,
            target,
        });
        Ok(())
    }
}
