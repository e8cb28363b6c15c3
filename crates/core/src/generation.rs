//! Generation run state machine, compensation log and error taxonomy.
//!
//! A run moves linearly through [`GenerationStage`]s with no retry. Every
//! side effect registers a [`Compensation`]; when a stage fails the
//! orchestrator unwinds the log in reverse and reports what was completed
//! and what was rolled back in a [`FatalReport`].

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::conflict::ConflictVerdict;
use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStage {
    Received,
    ConflictChecked,
    RecordCreated,
    DirectoryCreated,
    SchemaApplied,
    ModelWritten,
    SurfaceWritten,
    AutoloadRefreshed,
    Done,
}

impl GenerationStage {
    /// Stages in execution order.
    pub const ORDER: &'static [GenerationStage] = &[
        GenerationStage::Received,
        GenerationStage::ConflictChecked,
        GenerationStage::RecordCreated,
        GenerationStage::DirectoryCreated,
        GenerationStage::SchemaApplied,
        GenerationStage::ModelWritten,
        GenerationStage::SurfaceWritten,
        GenerationStage::AutoloadRefreshed,
        GenerationStage::Done,
    ];

    /// The stage that follows this one, `None` for [`GenerationStage::Done`].
    pub fn next(self) -> Option<GenerationStage> {
        let idx = Self::ORDER.iter().position(|s| *s == self)?;
        Self::ORDER.get(idx + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GenerationStage::Received => "received",
            GenerationStage::ConflictChecked => "conflict_checked",
            GenerationStage::RecordCreated => "record_created",
            GenerationStage::DirectoryCreated => "directory_created",
            GenerationStage::SchemaApplied => "schema_applied",
            GenerationStage::ModelWritten => "model_written",
            GenerationStage::SurfaceWritten => "surface_written",
            GenerationStage::AutoloadRefreshed => "autoload_refreshed",
            GenerationStage::Done => "done",
        }
    }
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Compensations
// ---------------------------------------------------------------------------

/// Undo action for one completed side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Compensation {
    /// Delete the module record and its seeded permissions.
    DeleteRecord { module_id: DbId, code: String },
    RemoveDirectory { path: PathBuf },
    DropTable { table: String },
    ForgetMigration { name: String },
}

impl fmt::Display for Compensation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compensation::DeleteRecord { code, .. } => write!(f, "delete module record '{code}'"),
            Compensation::RemoveDirectory { path } => {
                write!(f, "remove directory '{}'", path.display())
            }
            Compensation::DropTable { table } => write!(f, "drop table '{table}'"),
            Compensation::ForgetMigration { name } => write!(f, "forget migration '{name}'"),
        }
    }
}

/// Result of running one compensation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensationOutcome {
    pub compensation: Compensation,
    pub succeeded: bool,
    pub error: Option<String>,
}

/// Tracks stage progress and the compensations registered so far.
#[derive(Debug, Clone)]
pub struct GenerationRun {
    code: String,
    completed: Vec<GenerationStage>,
    compensations: Vec<Compensation>,
}

impl GenerationRun {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            completed: vec![GenerationStage::Received],
            compensations: Vec::new(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Last completed stage.
    pub fn current(&self) -> GenerationStage {
        self.completed
            .last()
            .copied()
            .unwrap_or(GenerationStage::Received)
    }

    /// The stage currently being attempted.
    pub fn pending(&self) -> GenerationStage {
        self.current().next().unwrap_or(GenerationStage::Done)
    }

    pub fn completed(&self) -> &[GenerationStage] {
        &self.completed
    }

    /// Mark `stage` completed. Stages must complete strictly in order.
    pub fn complete(&mut self, stage: GenerationStage) -> Result<(), CoreError> {
        if self.current().next() != Some(stage) {
            return Err(CoreError::Internal(format!(
                "Stage {stage} cannot follow {}",
                self.current()
            )));
        }
        self.completed.push(stage);
        Ok(())
    }

    /// Register the undo action for a side effect that just succeeded.
    pub fn register(&mut self, compensation: Compensation) {
        self.compensations.push(compensation);
    }

    pub fn compensations(&self) -> &[Compensation] {
        &self.compensations
    }

    /// Drain the compensation log in reverse registration order.
    pub fn take_compensations(&mut self) -> Vec<Compensation> {
        let mut log = std::mem::take(&mut self.compensations);
        log.reverse();
        log
    }

    /// Turn a stage failure into the final report.
    pub fn into_fatal(
        self,
        message: impl Into<String>,
        rollback: Vec<CompensationOutcome>,
    ) -> FatalReport {
        FatalReport {
            code: self.code.clone(),
            failed_stage: self.pending(),
            completed_stages: self.completed,
            message: message.into(),
            rollback,
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Structured description of a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FatalReport {
    pub code: String,
    pub failed_stage: GenerationStage,
    pub completed_stages: Vec<GenerationStage>,
    pub message: String,
    pub rollback: Vec<CompensationOutcome>,
}

impl FatalReport {
    /// Whether every compensation succeeded, leaving no partial module.
    pub fn fully_rolled_back(&self) -> bool {
        self.rollback.iter().all(|o| o.succeeded)
    }

    /// Compensations that failed and need manual cleanup.
    pub fn leftovers(&self) -> Vec<String> {
        self.rollback
            .iter()
            .filter(|o| !o.succeeded)
            .map(|o| o.compensation.to_string())
            .collect()
    }
}

/// Successful run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub code: String,
    pub stages: Vec<GenerationStage>,
    /// Non-fatal issues, e.g. a failed catalog refresh.
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Malformed or incomplete input. No side effects happened.
    #[error("Validation failed: {message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    /// Rejected by the conflict checker. No side effects happened.
    #[error("Module conflict: {}", .0.summary())]
    Conflict(ConflictVerdict),

    /// A stage failed after at least one side effect.
    #[error("Module generation failed at stage {}: {}", .0.failed_stage, .0.message)]
    Fatal(FatalReport),
}

impl GenerationError {
    pub fn validation(field: &str, message: impl fmt::Display) -> Self {
        GenerationError::Validation {
            field: Some(field.to_string()),
            message: message.to_string(),
        }
    }

    pub fn validation_message(message: impl Into<String>) -> Self {
        GenerationError::Validation {
            field: None,
            message: message.into(),
        }
    }
}
