use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::cli::{Cli, DiscoveryArgs};
use crate::finder::default_exclusions;

pub const PM_KWARG: &str = "pm";
pub const TOOL_JAR_ENV: &str = "CALLGRAPH_TOOL_JAR";
pub const DEFAULT_LANGUAGE: &str = "java";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Build system selected by the `pm` keyword option.
///
/// Anything other than `maven` or `gradle`, including no value at all, is
/// `Unspecified`, which discovers roots the Maven way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildSystem {
    Maven,
    Gradle,
    #[default]
    Unspecified,
}

impl BuildSystem {
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag.map(|t| t.trim().to_ascii_lowercase()).as_deref() {
            Some("maven") => BuildSystem::Maven,
            Some("gradle") => BuildSystem::Gradle,
            None | Some("") => BuildSystem::Unspecified,
            Some(other) => {
                debug!(pm = other, "unrecognized build system, using maven discovery");
                BuildSystem::Unspecified
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildSystem::Maven => "maven",
            BuildSystem::Gradle => "gradle",
            BuildSystem::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for BuildSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub language: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub kwargs: BTreeMap<String, String>,
}

impl BuildConfig {
    pub fn new(
        language: impl Into<String>,
        args: Vec<String>,
        kwargs: BTreeMap<String, String>,
    ) -> Self {
        Self {
            language: language.into(),
            args,
            kwargs,
        }
    }

    pub fn java(build_system: BuildSystem) -> Self {
        let mut kwargs = BTreeMap::new();
        if build_system != BuildSystem::Unspecified {
            kwargs.insert(PM_KWARG.to_string(), build_system.as_str().to_string());
        }
        Self::new(DEFAULT_LANGUAGE, Vec::new(), kwargs)
    }

    pub fn kwargs(&self) -> &BTreeMap<String, String> {
        &self.kwargs
    }

    pub fn build_system(&self) -> BuildSystem {
        BuildSystem::from_tag(self.kwargs.get(PM_KWARG).map(String::as_str))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub paths: Vec<PathBuf>,
    pub exclusions: Vec<String>,
    pub builds: Vec<BuildConfig>,
    pub timeout_secs: u64,
    pub workers: usize,
    pub tool_jar: Option<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            paths: vec![PathBuf::from(".")],
            exclusions: default_exclusions(),
            builds: vec![BuildConfig::java(BuildSystem::Unspecified)],
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            workers: 1,
            tool_jar: None,
        }
    }
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Applies command-line discovery flags on top of the file configuration.
    pub fn apply_discovery(&mut self, args: &DiscoveryArgs) {
        if !args.paths.is_empty() {
            self.paths = args.paths.clone();
        }
        self.exclusions.extend(args.exclusions.iter().cloned());
        if let Some(pm) = args.pm {
            self.builds = vec![BuildConfig::java(pm.into())];
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<GeneratorConfig> {
    let Some(path) = path else {
        return Ok(GeneratorConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

pub fn resolve_config(cli: &Cli, discovery: &DiscoveryArgs) -> Result<GeneratorConfig> {
    let mut config = load_config(cli.config.as_deref())?;
    config.apply_discovery(discovery);
    if let Some(jar) = cli.tool_jar.clone() {
        config.tool_jar = Some(jar);
    }
    Ok(config)
}

pub fn resolve_tool_jar(config: &GeneratorConfig) -> Result<PathBuf> {
    if let Some(p) = config.tool_jar.clone() {
        return Ok(p);
    }

    if let Ok(p) = env::var(TOOL_JAR_ENV) {
        return Ok(PathBuf::from(p));
    }

    Ok(callgraph_home()?.join("tools").join("callgraph.jar"))
}

fn callgraph_home() -> Result<PathBuf> {
    let base = dirs::data_local_dir()
        .or_else(dirs::cache_dir)
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow::anyhow!("Failed to resolve data directory"))?;
    Ok(base.join("callgraph-gen"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::PmArg;

    #[test]
    fn build_system_tags_fall_back_to_unspecified() {
        assert_eq!(BuildSystem::from_tag(Some("maven")), BuildSystem::Maven);
        assert_eq!(BuildSystem::from_tag(Some(" Gradle ")), BuildSystem::Gradle);
        assert_eq!(BuildSystem::from_tag(Some("sbt")), BuildSystem::Unspecified);
        assert_eq!(BuildSystem::from_tag(None), BuildSystem::Unspecified);
    }

    #[test]
    fn build_config_reads_pm_kwarg() {
        let mut kwargs = BTreeMap::new();
        kwargs.insert("pm".to_string(), "gradle".to_string());
        let config = BuildConfig::new("java", vec!["arg1".into()], kwargs);
        assert_eq!(config.build_system(), BuildSystem::Gradle);
        assert_eq!(config.kwargs()["pm"], "gradle");

        let config = BuildConfig::java(BuildSystem::Unspecified);
        assert!(config.kwargs().is_empty());
        assert_eq!(config.build_system(), BuildSystem::Unspecified);
    }

    #[test]
    fn load_config_fills_missing_fields_with_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("callgraph.json");
        std::fs::write(
            &path,
            r#"{"paths": ["svc"], "builds": [{"language": "java", "kwargs": {"pm": "gradle"}}], "workers": 3}"#,
        )?;

        let config = load_config(Some(&path))?;
        assert_eq!(config.paths, vec![PathBuf::from("svc")]);
        assert_eq!(config.workers, 3);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.exclusions, default_exclusions());
        assert_eq!(config.builds[0].build_system(), BuildSystem::Gradle);
        Ok(())
    }

    #[test]
    fn load_config_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn discovery_flags_override_file_settings() {
        let mut config = GeneratorConfig::default();
        config.apply_discovery(&DiscoveryArgs {
            paths: vec![PathBuf::from("a"), PathBuf::from("b")],
            exclusions: vec!["**/tmp/**".to_string()],
            pm: Some(PmArg::Maven),
        });

        assert_eq!(config.paths.len(), 2);
        assert!(config.exclusions.contains(&"**/tmp/**".to_string()));
        assert!(config.exclusions.contains(&"**/.git/**".to_string()));
        assert_eq!(config.builds, vec![BuildConfig::java(BuildSystem::Maven)]);
    }

    #[test]
    fn explicit_tool_jar_wins() -> Result<()> {
        let config = GeneratorConfig {
            tool_jar: Some(PathBuf::from("/opt/tools/cg.jar")),
            ..GeneratorConfig::default()
        };
        assert_eq!(resolve_tool_jar(&config)?, PathBuf::from("/opt/tools/cg.jar"));
        Ok(())
    }

    #[test]
    fn timeout_is_never_zero() {
        let config = GeneratorConfig {
            timeout_secs: 0,
            ..GeneratorConfig::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(1));
    }
}
