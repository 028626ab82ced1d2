//! Commands for resolving a Python requirements file.
//!
//! The virtual environment for `requirements.txt` lives next to it as
//! `requirements.txt.venv`.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::cmd::{command_for, lookup};

pub trait PipCmdFactory: Send + Sync {
    fn make_create_venv_cmd(&self, requirements: &Path) -> Result<Command>;

    fn make_activate_venv_cmd(&self, requirements: &Path) -> Result<Command>;

    fn make_install_cmd(&self, requirements: &Path) -> Result<Command>;

    fn make_cat_cmd(&self, requirements: &Path) -> Result<Command>;

    fn make_list_cmd(&self) -> Result<Command>;

    fn make_show_cmd(&self, packages: &[String]) -> Result<Command>;
}

pub fn venv_dir(requirements: &Path) -> PathBuf {
    let mut raw = requirements.as_os_str().to_os_string();
    raw.push(".venv");
    PathBuf::from(raw)
}

/// Resolves `python`, `bash`, `pip` and `cat` from `PATH`, or from an
/// explicit search path.
#[derive(Debug, Clone, Default)]
pub struct PipCommands {
    search_path: Option<OsString>,
}

impl PipCommands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
        }
    }

    fn program(&self, name: &str) -> Result<Command> {
        let path = match &self.search_path {
            Some(dirs) => which::which_in(name, Some(dirs), ".")
                .with_context(|| format!("Failed to locate {name} on PATH"))?,
            None => lookup(name)?,
        };
        Ok(command_for(&path))
    }
}

impl PipCmdFactory for PipCommands {
    fn make_create_venv_cmd(&self, requirements: &Path) -> Result<Command> {
        let mut cmd = self.program("python")?;
        cmd.args(["-m", "venv"])
            .arg(venv_dir(requirements))
            .arg("--clear");
        Ok(cmd)
    }

    fn make_activate_venv_cmd(&self, requirements: &Path) -> Result<Command> {
        let activate = venv_dir(requirements).join("bin").join("activate");
        let mut script = OsString::from("source ");
        script.push(activate.as_os_str());

        let mut cmd = self.program("bash")?;
        cmd.arg("-c").arg(script);
        Ok(cmd)
    }

    fn make_install_cmd(&self, requirements: &Path) -> Result<Command> {
        let mut cmd = self.program("pip")?;
        cmd.args(["install", "-r"]).arg(requirements);
        Ok(cmd)
    }

    fn make_cat_cmd(&self, requirements: &Path) -> Result<Command> {
        let mut cmd = self.program("cat")?;
        cmd.arg(requirements);
        Ok(cmd)
    }

    fn make_list_cmd(&self) -> Result<Command> {
        let mut cmd = self.program("pip")?;
        cmd.arg("list");
        Ok(cmd)
    }

    fn make_show_cmd(&self, packages: &[String]) -> Result<Command> {
        let mut cmd = self.program("pip")?;
        cmd.arg("show").args(packages);
        Ok(cmd)
    }
}
