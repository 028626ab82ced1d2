use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const INIT_SCRIPT_NAME: &str = ".callgraph-init.gradle";
pub const GRADLE_BIN: &str = "gradle";

#[cfg(windows)]
pub const WRAPPER_NAME: &str = "gradlew.bat";
#[cfg(not(windows))]
pub const WRAPPER_NAME: &str = "gradlew";

const INIT_SCRIPT: &str = include_str!("assets/callgraph-init.gradle");

/// The project's own wrapper when it ships one, otherwise the system `gradle`.
pub fn gradle_executable(root: &Path) -> PathBuf {
    let wrapper = root.join(WRAPPER_NAME);
    if wrapper.is_file() {
        wrapper
    } else {
        PathBuf::from(GRADLE_BIN)
    }
}

/// Writes the dependency-copy init script into `root` and returns its path.
pub fn write_init_script(root: &Path) -> Result<PathBuf> {
    let path = root.join(INIT_SCRIPT_NAME);
    if std::fs::read_to_string(&path).is_ok_and(|existing| existing == INIT_SCRIPT) {
        return Ok(path);
    }
    std::fs::write(&path, INIT_SCRIPT)
        .with_context(|| format!("Failed to write Gradle init script: {}", path.display()))?;
    Ok(path)
}
