use anyhow::{Context, Result, bail};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

pub const JAVA_ENV: &str = "CALLGRAPH_JAVA";
pub const GRADLE_TASK: &str = "copyCallgraphDependencies";
pub const GRADLE_TARGET_PROPERTY: &str = "callgraphDepsDir";

/// Builds the external commands a Java job runs.
pub trait CmdFactory: Send + Sync {
    fn make_mvn_copy_dependencies_cmd(
        &self,
        working_dir: &Path,
        target_dir: &Path,
    ) -> Result<Command>;

    fn make_gradle_copy_dependencies_cmd(
        &self,
        working_dir: &Path,
        gradlew: &Path,
        init_script: &Path,
        target_dir: &Path,
    ) -> Result<Command>;

    fn make_call_graph_generation_cmd(
        &self,
        tool_jar: &Path,
        working_dir: &Path,
        target_classes: &Path,
        dependency_dir: &Path,
        output: &Path,
    ) -> Result<Command>;
}

#[derive(Debug, Clone, Default)]
pub struct JavaCmdFactory {
    java: Option<PathBuf>,
}

impl JavaCmdFactory {
    /// Uses `CALLGRAPH_JAVA` when set, otherwise `java` from `PATH`.
    pub fn new() -> Self {
        Self {
            java: std::env::var_os(JAVA_ENV).map(PathBuf::from),
        }
    }

    pub fn with_java(java: impl Into<PathBuf>) -> Self {
        Self {
            java: Some(java.into()),
        }
    }

    fn java_program(&self) -> Result<PathBuf> {
        match self.java.clone() {
            Some(java) => Ok(java),
            None => lookup("java"),
        }
    }
}

impl CmdFactory for JavaCmdFactory {
    fn make_mvn_copy_dependencies_cmd(
        &self,
        working_dir: &Path,
        target_dir: &Path,
    ) -> Result<Command> {
        let mvn = lookup("mvn")?;
        let mut cmd = command_for(&mvn);
        cmd.current_dir(working_dir)
            .args(["-q", "-B", "dependency:copy-dependencies", "-DskipTests"])
            .arg(property("-DoutputDirectory=", target_dir));
        Ok(cmd)
    }

    fn make_gradle_copy_dependencies_cmd(
        &self,
        working_dir: &Path,
        gradlew: &Path,
        init_script: &Path,
        target_dir: &Path,
    ) -> Result<Command> {
        let program = if gradlew.is_file() {
            gradlew.to_path_buf()
        } else {
            lookup(gradlew)?
        };
        let mut cmd = command_for(&program);
        cmd.current_dir(working_dir)
            .arg("-q")
            .arg("-p")
            .arg(working_dir)
            .arg("--init-script")
            .arg(init_script)
            .arg(property(&format!("-P{GRADLE_TARGET_PROPERTY}="), target_dir))
            .arg(GRADLE_TASK);
        Ok(cmd)
    }

    fn make_call_graph_generation_cmd(
        &self,
        tool_jar: &Path,
        working_dir: &Path,
        target_classes: &Path,
        dependency_dir: &Path,
        output: &Path,
    ) -> Result<Command> {
        if !tool_jar.is_file() {
            bail!("call graph generator not found: {}", tool_jar.display());
        }
        let java = self.java_program()?;
        let mut cmd = command_for(&java);
        cmd.current_dir(working_dir)
            .arg("-jar")
            .arg(tool_jar)
            .arg("-u")
            .arg(target_classes)
            .arg("-l")
            .arg(dependency_dir)
            .arg("-f")
            .arg(output);
        Ok(cmd)
    }
}

pub(crate) fn lookup(program: impl AsRef<Path>) -> Result<PathBuf> {
    let program = program.as_ref();
    which::which(program)
        .with_context(|| format!("Failed to locate {} on PATH", program.display()))
}

pub(crate) fn command_for(program: &Path) -> Command {
    #[cfg(windows)]
    {
        let lower = program.to_string_lossy().to_ascii_lowercase();
        if lower.ends_with(".cmd") || lower.ends_with(".bat") {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(program);
            return cmd;
        }
    }

    Command::new(program)
}

fn property(prefix: &str, value: &Path) -> OsString {
    let mut raw = OsString::from(prefix);
    raw.push(value.as_os_str());
    raw
}
