use std::sync::Arc;

use tracing::{debug, info_span, warn};

use crate::broadcast::JobPhase;
use crate::db::{artifact_repo, ArtifactRow, Database};
use crate::generation::{self, GenerationStrategy};
use crate::sanitize;
use crate::storage::FileStorage;

use super::config::PipelineConfig;
use super::context::PipelineContext;
use super::error::PipelineError;
use super::outcome::RunOutcome;
use super::progress::ProgressReporter;

pub struct Pipeline {
    config: Arc<PipelineConfig>,
    db: Database,
    storage: FileStorage,
}

impl Pipeline {
    pub fn from_config(config: Arc<PipelineConfig>, db: Database) -> Self {
        let storage = FileStorage::new(&config.uploads_dir, &config.artifacts_dir);
        Self {
            config,
            db,
            storage,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn storage(&self) -> &FileStorage {
        &self.storage
    }

    /// Runs extraction, generation and persistence for one job.
    ///
    /// The job must already be `processing`. On success it is `completed`
    /// with all five artifacts registered; on any other outcome the job row
    /// is left untouched for the caller to settle.
    pub fn run(
        &self,
        mut ctx: PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> (RunOutcome, PipelineContext) {
        let filename = sanitize::redact_path(&ctx.upload_path);
        let _pipeline_span = info_span!("pipeline",
            job_id = %ctx.job_id,
            filename = %filename,
            retries = ctx.retries,
        )
        .entered();

        // Step 1: Extract project context
        {
            let _step = info_span!("extract_context").entered();
            progress.phase(JobPhase::ExtractingContext, "Reading uploaded project...");
            if let Err(e) = self.step_extract_context(&mut ctx) {
                return (RunOutcome::Fatal(e.to_string()), ctx);
            }
        }

        // Step 2: Generate artifact content
        {
            let _step = info_span!("generate").entered();
            progress.phase(JobPhase::Generating, "Generating documentation...");
            if let Err(e) = self.step_generate(&mut ctx) {
                return (self.outcome_for_provider_error(e, ctx.retries), ctx);
            }
        }

        // Step 3: Write files and complete the job
        {
            let _step = info_span!("persist").entered();
            progress.phase(JobPhase::Persisting, "Saving artifacts...");
            if let Err(e) = self.step_persist(&mut ctx) {
                return (RunOutcome::Fatal(e.to_string()), ctx);
            }
        }

        let artifacts = ctx.artifacts.clone();
        (RunOutcome::Success(artifacts), ctx)
    }

    fn step_extract_context(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let text = generation::extract_context(&self.storage, &ctx.upload_path)?;
        debug!(chars = text.chars().count(), "Extracted project context");
        ctx.project_context = Some(text);
        Ok(())
    }

    fn step_generate(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let strategy = GenerationStrategy::select(&self.config).map_err(PipelineError::Provider)?;
        ctx.strategy = Some(strategy.name());
        debug!(strategy = strategy.name(), "Selected generation strategy");

        let context = ctx.project_context.as_deref().unwrap_or_default();
        ctx.generated = generation::generate_all(&strategy, context, &self.config.routes)
            .map_err(PipelineError::Provider)?;
        Ok(())
    }

    fn step_persist(&self, ctx: &mut PipelineContext) -> Result<(), PipelineError> {
        let mut rows = Vec::with_capacity(ctx.generated.len());
        for artifact in &ctx.generated {
            let path =
                self.storage
                    .write_artifact(&ctx.job_id, &artifact.kind.file_name(), &artifact.content)?;
            rows.push(ArtifactRow::new(
                ctx.job_id.clone(),
                artifact.kind,
                path.display().to_string(),
                artifact.content.clone(),
            ));
        }

        artifact_repo::complete_job_with_artifacts(&self.db, &ctx.job_id, &rows)?;
        ctx.artifacts = rows;
        Ok(())
    }

    /// Rate limits become a delayed whole-run retry; anything else is fatal.
    fn outcome_for_provider_error(&self, error: PipelineError, retries: u32) -> RunOutcome {
        match error {
            PipelineError::Provider(e) if e.is_rate_limited() => {
                let policy_delay = self.config.retry.delay_for(retries);
                let delay = e.retry_after().map_or(policy_delay, |hint| hint.max(policy_delay));
                warn!(delay_secs = delay.as_secs(), "Provider rate limited the run");
                RunOutcome::RetryAfter(delay)
            }
            other => RunOutcome::Fatal(other.to_string()),
        }
    }
}
