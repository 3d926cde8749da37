//! Declarative job plans: a process made of stages, each either a single
//! body or a list of items, with the items that should fail listed up front.

use std::collections::HashSet;
use std::path::Path;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use jobtrack_core::{FaultTolerance, JobConfiguration, JobReport, JobType};
use jobtrack_exec::{Job, JobError, JobProgress, RunStage};

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML parse failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid job plan: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobPlan {
    pub name: String,
    pub job_type: JobType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
    /// Run under a tracker that records nothing when false.
    #[serde(default = "default_true")]
    pub track_progress: bool,
    pub stages: Vec<StagePlan>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StagePlan {
    pub description: String,
    #[serde(default)]
    pub fault_tolerance: FaultTolerance,
    #[serde(default)]
    pub items: Vec<String>,
    /// Ids of `items` whose processing fails.
    #[serde(default)]
    pub fail: Vec<String>,
    /// Pause before each item, or before the body of an item-less stage.
    #[serde(default)]
    pub delay_ms: u64,
    /// Error raised by the body of an item-less stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_stage: Option<String>,
    /// Reason to mark the stage skipped without running anything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<String>,
}

fn default_true() -> bool {
    true
}

impl JobPlan {
    pub fn load(path: &Path) -> Result<(Self, PlanFormat), PlanError> {
        let content = std::fs::read_to_string(path).map_err(|source| PlanError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// JSON when the document starts with `{`, YAML otherwise.
    pub fn parse(content: &str) -> Result<(Self, PlanFormat), PlanError> {
        let (plan, format) = if content.trim_start().starts_with('{') {
            (serde_json::from_str::<JobPlan>(content)?, PlanFormat::Json)
        } else {
            (serde_yaml::from_str::<JobPlan>(content)?, PlanFormat::Yaml)
        };
        plan.validate()?;
        Ok((plan, format))
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        let mut violations = Vec::new();
        if self.name.trim().is_empty() {
            violations.push("name: must not be empty".to_string());
        }
        if self.stages.is_empty() {
            violations.push("stages: at least one stage is required".to_string());
        }
        for (index, stage) in self.stages.iter().enumerate() {
            let at = format!("stages[{index}]");
            if stage.description.trim().is_empty() {
                violations.push(format!("{at}.description: must not be empty"));
            }
            let mut seen = HashSet::new();
            for id in &stage.items {
                if !seen.insert(id.as_str()) {
                    violations.push(format!("{at}.items: duplicate item `{id}`"));
                }
            }
            for id in &stage.fail {
                if !seen.contains(id.as_str()) {
                    violations.push(format!("{at}.fail: `{id}` is not one of the stage items"));
                }
            }
            if stage.fail_stage.is_some() && !stage.items.is_empty() {
                violations.push(format!("{at}.failStage: only allowed on stages without items"));
            }
            if stage.skip.is_some() && (!stage.items.is_empty() || stage.fail_stage.is_some()) {
                violations.push(format!("{at}.skip: a skipped stage runs nothing"));
            }
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(PlanError::Invalid(violations))
        }
    }

    pub fn item_count(&self) -> usize {
        self.stages.iter().map(|s| s.items.len()).sum()
    }

    pub fn configuration(&self) -> JobConfiguration {
        let mut config = JobConfiguration::new(self.job_type, self.name.clone());
        config.parameters = self.parameters.clone();
        config
    }
}

/// Runs a [`JobPlan`] as a job.
pub struct PlannedJob {
    plan: JobPlan,
}

impl PlannedJob {
    pub fn new(plan: JobPlan) -> Self {
        Self { plan }
    }

    /// Runs one stage; false once the process cannot go on.
    fn run_stage_plan(
        &self,
        stage: &StagePlan,
        progress: &mut dyn JobProgress,
    ) -> Result<bool, JobError> {
        progress.starting_stage_with(&stage.description, stage.items.len(), stage.fault_tolerance)?;

        if let Some(reason) = &stage.skip {
            progress.skipped_stage(Some(reason))?;
            return Ok(true);
        }

        let delay = Duration::from_millis(stage.delay_ms);
        if stage.items.is_empty() {
            progress.run_stage(|| {
                pause(delay);
                match &stage.fail_stage {
                    Some(error) => Err(JobError::failed(error.clone())),
                    None => Ok(()),
                }
            })?;
            return Ok(true);
        }

        let succeeded = progress.run_stage_items(
            stage.items.iter(),
            |id| id.to_string(),
            |id| {
                pause(delay);
                if stage.fail.contains(id) {
                    Err(format!("item `{id}` failed"))
                } else {
                    Ok(())
                }
            },
            |successes, failures| format!("{successes} succeeded, {failures} failed"),
        )?;
        Ok(succeeded || !stage.fault_tolerance.fails_process())
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

impl Job for PlannedJob {
    fn job_type(&self) -> JobType {
        self.plan.job_type
    }

    fn tracks_progress(&self) -> bool {
        self.plan.track_progress
    }

    fn execute(
        &self,
        config: &JobConfiguration,
        progress: &mut dyn JobProgress,
    ) -> Result<Option<JobReport>, JobError> {
        progress.starting_process(&config.name)?;
        for stage in &self.plan.stages {
            if progress.is_cancelled() || !self.run_stage_plan(stage, progress)? {
                break;
            }
        }
        progress.completed_process(None)?;

        Ok(Some(JobReport::new(
            "jobPlan",
            serde_json::json!({
                "name": self.plan.name,
                "stages": self.plan.stages.len(),
                "items": self.plan.item_count(),
            }),
        )))
    }
}
