use crate::error::{PipelineError, Result};
use glob::glob;
use std::{
    io,
    path::{Path, PathBuf},
};

/// Resolve a requested artifact name inside `dir`.
///
/// Names containing `..` or `/` are rejected; a name that does not exist is
/// reported as `NotFound`.
pub fn resolve_artifact(dir: &Path, file_name: &str) -> Result<PathBuf> {
    if file_name.contains("..") || file_name.contains('/') || file_name.is_empty() {
        return Err(PipelineError::validation(format!(
            "invalid filename '{}'",
            file_name
        )));
    }
    let path = dir.join(file_name);
    if !path.is_file() {
        return Err(PipelineError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("file not found: {}", file_name),
        )));
    }
    Ok(path)
}

/// File names of every `*.<extension>` artifact directly inside `dir`, sorted.
pub fn list_artifacts(dir: &Path, extension: &str) -> Result<Vec<String>> {
    let pattern = format!("{}/*.{}", dir.display(), extension);
    let paths = glob(&pattern)
        .map_err(|e| PipelineError::validation(format!("bad artifact pattern: {}", e)))?;
    let mut names: Vec<String> = paths
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
        .collect();
    names.sort();
    Ok(names)
}
