use crate::domain::{ChallengerError, PipelineResult};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ArtifactWriteError {
    #[error("failed to create artifact directory '{}': {source}", .path.display())]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize artifact '{}': {source}", .path.display())]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write artifact '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<ArtifactWriteError> for ChallengerError {
    fn from(error: ArtifactWriteError) -> Self {
        let placeholder = match error {
            ArtifactWriteError::Directory { .. } => "IO.ARTIFACT_DIRECTORY",
            ArtifactWriteError::Serialize { .. } => "SYS.ARTIFACT_SERIALIZE",
            ArtifactWriteError::Write { .. } => "IO.ARTIFACT_WRITE",
        };
        match error {
            ArtifactWriteError::Serialize { .. } => {
                ChallengerError::internal(placeholder, error.to_string())
            }
            _ => ChallengerError::io_system(placeholder, error.to_string()),
        }
    }
}

/// Pretty-printed JSON, parent directories created as needed.
pub fn write_json_artifact<T: Serialize + ?Sized>(path: &Path, value: &T) -> PipelineResult<()> {
    if let Some(parent_dir) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent_dir).map_err(|source| ArtifactWriteError::Directory {
            path: parent_dir.to_path_buf(),
            source,
        })?;
    }

    let json = serde_json::to_string_pretty(value).map_err(|source| {
        ArtifactWriteError::Serialize {
            path: path.to_path_buf(),
            source,
        }
    })?;
    fs::write(path, json).map_err(|source| ArtifactWriteError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}
