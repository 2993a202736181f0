//! Guarded file operations for the repair workspace.
//!
//! The fixer and test generator write real files; writes are restricted to
//! paths containing an allowed component so a misbehaving fix can never
//! land outside the workspace.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::domain::error::{MendError, Result};

/// Path components a write target must contain.
pub const DEFAULT_ALLOWED_COMPONENTS: &[&str] = &["sandbox", "test"];

/// Whether `path` contains one of the allowed components.
pub fn is_safe_path(path: &Path, allowed: &[&str]) -> bool {
    path.components().any(|component| {
        let text = component.as_os_str().to_string_lossy();
        allowed
            .iter()
            .any(|allowed_component| text.contains(allowed_component))
    })
}

/// Recursively collect `.py` files under `dir`, in discovery order.
pub fn find_python_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "py"))
        .collect()
}

/// Read a file to a string.
pub fn read_file(path: &Path) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}

/// Write `content` to `path`, enforcing the sandbox guard and creating
/// parent directories as needed.
pub fn write_file(path: &Path, content: &str, allowed: &[&str]) -> Result<()> {
    if !is_safe_path(path, allowed) {
        return Err(MendError::UnsafePath(path.display().to_string()));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(path, content)?;
    Ok(())
}
