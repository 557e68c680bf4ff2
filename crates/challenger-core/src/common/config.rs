use super::constants::{
    CANDIDATES_DIR_NAME, NEGATIVE_PEAKLIST_DIR_NAME, POSITIVE_PEAKLIST_DIR_NAME,
    REACTION_DATABASE_FILE_NAME, SOLUTIONS_FILE_NAME, SUMMARY_FILE_NAME,
};
use crate::domain::{ExecutionMode, IonMode};
use std::path::{Path, PathBuf};

/// What a group does when one of its challenges fails fatally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FailurePolicy {
    /// Stop launching work and fail the group (and the run) with the error.
    #[default]
    Abort,
    /// Record the failure next to the group's results and keep going.
    Isolate,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data_root: PathBuf,
    pub results_root: PathBuf,
    pub reaction_database_path: PathBuf,
    pub data_archive: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub execution_mode: ExecutionMode,
    pub failure_policy: FailurePolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            results_root: PathBuf::from("results"),
            reaction_database_path: PathBuf::from(REACTION_DATABASE_FILE_NAME),
            data_archive: None,
            concurrency: None,
            execution_mode: ExecutionMode::Normal,
            failure_policy: FailurePolicy::Abort,
        }
    }
}

impl RunConfig {
    pub fn candidates_dir(&self) -> PathBuf {
        self.data_root.join(CANDIDATES_DIR_NAME)
    }

    pub fn peaklist_dir(&self, mode: IonMode) -> PathBuf {
        match mode {
            IonMode::Positive => self.data_root.join(POSITIVE_PEAKLIST_DIR_NAME),
            IonMode::Negative => self.data_root.join(NEGATIVE_PEAKLIST_DIR_NAME),
        }
    }

    pub fn solutions_path(&self) -> PathBuf {
        self.data_root.join(SOLUTIONS_FILE_NAME)
    }

    pub fn results_dir(&self, mode: IonMode) -> PathBuf {
        self.results_root.join(mode.as_str())
    }

    pub fn result_path(&self, mode: IonMode, challenge_name: &str) -> PathBuf {
        self.results_dir(mode).join(format!("{challenge_name}.json"))
    }

    pub fn summary_path(&self, mode: IonMode) -> PathBuf {
        self.results_dir(mode).join(SUMMARY_FILE_NAME)
    }

    pub fn effective_concurrency(&self) -> usize {
        self.concurrency
            .map(|requested| requested.max(1))
            .unwrap_or_else(default_concurrency)
    }

    /// Rebases every relative path onto `base`.
    pub fn resolve_against(mut self, base: &Path) -> Self {
        self.data_root = resolve_path(base, &self.data_root);
        self.results_root = resolve_path(base, &self.results_root);
        self.reaction_database_path = resolve_path(base, &self.reaction_database_path);
        self.data_archive = self
            .data_archive
            .as_deref()
            .map(|archive| resolve_path(base, archive));
        self
    }
}

/// Half of the host parallelism, never below one.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|parallelism| (parallelism.get() / 2).max(1))
        .unwrap_or(1)
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
