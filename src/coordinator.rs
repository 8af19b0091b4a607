use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::corrector::{CodeCorrector, CorrectionOptions, CorrectionReport};
use crate::design::{self, DesignProposal, InstructionAnalysis};
use crate::errors::{Result, StudioError};
use crate::events::{EventSink, StudioEvent};
use crate::extract::extract_code_content;
use crate::prompt::build_prompt;
use crate::provider::ModelRegistry;
use crate::wire::{FileDescription, GeneratedFile, TechnologyStack};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Design,
    Code,
    Coordinator,
}

impl AgentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Design => "design",
            AgentType::Code => "code",
            AgentType::Coordinator => "coordinator",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Working,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorTask {
    pub id: String,
    pub description: String,
    pub agent_type: AgentType,
    pub status: TaskStatus,
    pub progress: u8,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub subtasks: Vec<CoordinatorTask>,
}

impl CoordinatorTask {
    fn new(agent_type: AgentType, description: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            id: format!("task-{}-{}", agent_type.as_str(), Uuid::new_v4()),
            description: description.into(),
            agent_type,
            status,
            progress: 0,
            start_time: Utc::now(),
            end_time: None,
            error: None,
            subtasks: Vec::new(),
        }
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut CoordinatorTask> {
        if self.id == id {
            return Some(self);
        }
        self.subtasks.iter_mut().find_map(|t| t.find_mut(id))
    }

    fn set_status(&mut self, status: TaskStatus, error: Option<String>, progress: Option<u8>) {
        self.status = status;
        if error.is_some() {
            self.error = error;
        }
        if let Some(p) = progress {
            self.progress = p.min(100);
        }
        if status.is_finished() {
            self.end_time = Some(Utc::now());
        }
    }
}

/// Everything a website run produced, also on failure.
#[derive(Debug, Clone)]
pub struct WebsiteOutcome {
    pub analysis: Option<InstructionAnalysis>,
    pub proposal: Option<DesignProposal>,
    pub files: Vec<GeneratedFile>,
    pub tasks: Vec<CoordinatorTask>,
}

impl WebsiteOutcome {
    pub fn succeeded(&self) -> bool {
        self.tasks.first().is_some_and(|t| t.status == TaskStatus::Completed)
    }
}

/// Cloneable handle that stops a running coordinator between steps.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives design and code generation, keeping the task tree and the latest
/// file per path. Every task change is published as a `TaskUpdate`.
pub struct Coordinator {
    registry: Arc<ModelRegistry>,
    config: Config,
    events: EventSink,
    cancel: CancelHandle,
    tasks: Vec<CoordinatorTask>,
    files: Vec<GeneratedFile>,
    proposal: Option<DesignProposal>,
    analysis: Option<InstructionAnalysis>,
}

impl Coordinator {
    pub fn new(registry: Arc<ModelRegistry>, config: Config, events: impl Into<EventSink>) -> Self {
        Self {
            registry,
            config,
            events: events.into(),
            cancel: CancelHandle::default(),
            tasks: Vec::new(),
            files: Vec::new(),
            proposal: None,
            analysis: None,
        }
    }

    pub fn tasks(&self) -> &[CoordinatorTask] {
        &self.tasks
    }

    pub fn files(&self) -> &[GeneratedFile] {
        &self.files
    }

    pub fn design_proposal(&self) -> Option<&DesignProposal> {
        self.proposal.as_ref()
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// In-flight model calls finish; their results are dropped.
    pub fn cancel_processing(&self) {
        tracing::info!("cancellation requested");
        self.cancel.cancel();
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(StudioError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn start_run(&mut self) {
        self.cancel.reset();
        self.tasks.clear();
    }

    fn publish_tasks(&self) {
        self.events.emit(StudioEvent::TaskUpdate(self.tasks.clone()));
    }

    fn publish_files(&self) {
        self.events.emit(StudioEvent::FilesGenerated(self.files.clone()));
    }

    fn report_error(&self, msg: &str) {
        tracing::error!(error = %msg, "coordinator run failed");
        self.events.emit(StudioEvent::Error(msg.to_string()));
    }

    fn add_task(&mut self, parent: Option<&str>, agent: AgentType, description: impl Into<String>) -> String {
        self.insert_task(parent, CoordinatorTask::new(agent, description, TaskStatus::Working))
    }

    /// Adds a subtask that has not started yet.
    fn queue_task(&mut self, parent: &str, agent: AgentType, description: impl Into<String>) -> String {
        self.insert_task(Some(parent), CoordinatorTask::new(agent, description, TaskStatus::Pending))
    }

    fn insert_task(&mut self, parent: Option<&str>, task: CoordinatorTask) -> String {
        let id = task.id.clone();
        match parent.and_then(|p| self.tasks.iter_mut().find_map(|t| t.find_mut(p))) {
            Some(parent) => parent.subtasks.push(task),
            None => self.tasks.push(task),
        }
        self.publish_tasks();
        id
    }

    fn update_task(&mut self, id: &str, status: TaskStatus, error: Option<String>, progress: Option<u8>) {
        if let Some(task) = self.tasks.iter_mut().find_map(|t| t.find_mut(id)) {
            task.set_status(status, error, progress);
            self.publish_tasks();
        }
    }

    fn fail_task(&mut self, id: &str, err: &StudioError) {
        self.update_task(id, TaskStatus::Failed, Some(err.to_string()), Some(100));
    }

    fn store_file(&mut self, file: GeneratedFile) {
        match self.files.iter_mut().find(|f| f.path == file.path) {
            Some(existing) => *existing = file,
            None => self.files.push(file),
        }
    }

    /// Prompt, invoke with fallback, extract. Never stores.
    async fn produce(
        &self,
        file: &FileDescription,
        context: &str,
        stack: Option<&TechnologyStack>,
    ) -> Result<GeneratedFile> {
        let prompt = build_prompt(file, context, stack);
        let response = self.registry.try_with_fallback(&prompt, &self.config.model).await?;
        self.check_cancelled()?;
        if response.fallback_used {
            tracing::info!(path = %file.path, model = %response.model, "generated with fallback model");
        }
        let extraction = extract_code_content(&response.content, &file.path);
        Ok(extraction.into_file(&file.path))
    }

    pub async fn generate_file(
        &mut self,
        file: &FileDescription,
        context: &str,
        stack: Option<&TechnologyStack>,
    ) -> Result<GeneratedFile> {
        self.start_run();
        let task = self.add_task(None, AgentType::Code, format!("Generar archivo: {}", file.path));
        self.update_task(&task, TaskStatus::Working, None, Some(25));

        match self.produce(file, context, stack).await {
            Ok(generated) => {
                self.store_file(generated.clone());
                self.publish_files();
                self.update_task(&task, TaskStatus::Completed, None, Some(100));
                Ok(generated)
            }
            Err(e) => {
                self.fail_task(&task, &e);
                self.report_error(&e.to_string());
                Err(e)
            }
        }
    }

    /// Generates each planned file in order. Files without a path are
    /// skipped; a failing file is recorded on its subtask and skipped.
    pub async fn generate_from_plan(
        &mut self,
        files: &[FileDescription],
        context: &str,
        stack: Option<&TechnologyStack>,
    ) -> Result<Vec<GeneratedFile>> {
        self.start_run();
        let planned: Vec<&FileDescription> = files.iter().filter(|f| !f.path.trim().is_empty()).collect();
        if planned.is_empty() {
            let err = StudioError::Generation("no hay archivos para generar".into());
            self.report_error(&err.to_string());
            return Err(err);
        }

        let main = self.add_task(None, AgentType::Coordinator, format!("Generar {} archivo(s)", planned.len()));
        match self.generate_files(&main, &planned, context, stack).await {
            Ok(generated) if generated.is_empty() => {
                let err = StudioError::Generation("ningún archivo pudo generarse".into());
                self.fail_task(&main, &err);
                self.report_error(&err.to_string());
                Err(err)
            }
            Ok(generated) => {
                self.update_task(&main, TaskStatus::Completed, None, Some(100));
                Ok(generated)
            }
            Err(e) => {
                self.fail_task(&main, &e);
                self.report_error(&e.to_string());
                Err(e)
            }
        }
    }

    /// One subtask per file under `parent`. Only cancellation aborts.
    async fn generate_files(
        &mut self,
        parent: &str,
        planned: &[&FileDescription],
        context: &str,
        stack: Option<&TechnologyStack>,
    ) -> Result<Vec<GeneratedFile>> {
        let subtasks: Vec<String> = planned
            .iter()
            .map(|f| self.queue_task(parent, AgentType::Code, format!("Generar archivo: {}", f.path)))
            .collect();

        let mut generated = Vec::new();
        for (i, (file, task)) in planned.iter().zip(&subtasks).enumerate() {
            self.check_cancelled()?;
            self.update_task(task, TaskStatus::Working, None, Some(25));
            match self.produce(file, context, stack).await {
                Ok(g) => {
                    self.store_file(g.clone());
                    self.publish_files();
                    generated.push(g);
                    self.update_task(task, TaskStatus::Completed, None, Some(100));
                }
                Err(StudioError::Cancelled) => {
                    self.fail_task(task, &StudioError::Cancelled);
                    return Err(StudioError::Cancelled);
                }
                Err(e) => {
                    tracing::warn!(path = %file.path, error = %e, "file generation failed, skipping");
                    self.fail_task(task, &e);
                }
            }
            let progress = ((i + 1) * 100 / planned.len()) as u8;
            self.update_task(parent, TaskStatus::Working, None, Some(progress));
        }
        Ok(generated)
    }

    /// Instruction analysis and design stage, then one code subtask per
    /// static-site file. Failures are emitted as `Error` events and recorded
    /// on the task tree; the outcome carries whatever was produced.
    pub async fn generate_website(&mut self, description: &str) -> WebsiteOutcome {
        self.start_run();
        self.files.clear();
        self.proposal = None;
        self.analysis = None;

        let main = self.add_task(
            None,
            AgentType::Coordinator,
            format!("Generar sitio web moderno y atractivo: {description}"),
        );
        if let Err(e) = self.run_website(&main, description).await {
            self.fail_task(&main, &e);
            self.report_error(&e.to_string());
        } else {
            self.update_task(&main, TaskStatus::Completed, None, Some(100));
        }

        WebsiteOutcome {
            analysis: self.analysis.clone(),
            proposal: self.proposal.clone(),
            files: self.files.clone(),
            tasks: self.tasks.clone(),
        }
    }

    async fn run_website(&mut self, main: &str, description: &str) -> Result<()> {
        let design_task =
            self.add_task(Some(main), AgentType::Design, format!("Generar propuesta de diseño para: {description}"));
        self.update_task(&design_task, TaskStatus::Working, None, Some(10));

        let analysis = design::analyze_instruction(&self.registry, &self.config.model, description).await;
        if let Err(e) = self.check_cancelled() {
            self.fail_task(&design_task, &e);
            return Err(e);
        }
        self.analysis = Some(analysis.clone());
        self.update_task(&design_task, TaskStatus::Working, None, Some(25));

        let proposal = match design::propose(&self.registry, &self.config.model, description, &analysis).await {
            Ok(p) => p,
            Err(e) => {
                self.fail_task(&design_task, &e);
                return Err(e);
            }
        };
        if let Err(e) = self.check_cancelled() {
            self.fail_task(&design_task, &e);
            return Err(e);
        }
        self.update_task(&design_task, TaskStatus::Completed, None, Some(100));
        self.update_task(main, TaskStatus::Working, None, Some(30));

        let plan = design::static_site_plan(&proposal, description);
        self.proposal = Some(proposal);
        self.events.emit(StudioEvent::DesignProposalUpdate(self.proposal.clone()));

        let code_task =
            self.add_task(Some(main), AgentType::Code, "Generar código basado en la propuesta de diseño");
        let planned: Vec<&FileDescription> = plan.iter().collect();
        match self.generate_files(&code_task, &planned, description, None).await {
            Ok(_) => {
                self.update_task(&code_task, TaskStatus::Completed, None, Some(100));
                Ok(())
            }
            Err(e) => {
                self.fail_task(&code_task, &e);
                Err(e)
            }
        }
    }

    /// Runs the correction pipeline under a code task. `assist` names a
    /// model for the optional refinement pass.
    pub async fn correct_code(
        &mut self,
        code: &str,
        language: &str,
        options: &CorrectionOptions,
        assist: Option<&str>,
    ) -> Result<CorrectionReport> {
        self.start_run();
        let task = self.add_task(None, AgentType::Code, format!("Corregir código ({language})"));

        let mut corrector =
            CodeCorrector::new(self.events.clone()).with_max_length(self.config.max_code_length);
        if let Some(model) = assist {
            corrector = corrector.with_model(self.registry.clone(), model);
        }

        let result = corrector.run(code, language, options).await.and_then(|r| {
            self.check_cancelled()?;
            Ok(r)
        });
        match result {
            Ok(report) => {
                self.update_task(&task, TaskStatus::Completed, None, Some(100));
                Ok(report)
            }
            Err(e) => {
                self.fail_task(&task, &e);
                self.report_error(&e.to_string());
                Err(e)
            }
        }
    }
}
