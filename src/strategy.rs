use anyhow::{Result, bail};
use std::path::PathBuf;

use crate::config::BuildConfig;
use crate::finder::Finder;
use crate::java::{JavaStrategy, JavaToolchain};
use crate::job::Job;

/// Turns one build configuration plus the discovered files into jobs.
pub trait Strategy {
    /// An empty file set, or one without any root/class-dir pair, is
    /// `Ok(vec![])`, not an error.
    fn invoke(&self) -> Result<Vec<Box<dyn Job>>>;
}

pub trait StrategyFactory: Send + Sync {
    fn make<'a>(
        &self,
        config: &BuildConfig,
        files: &'a [PathBuf],
        finder: &'a dyn Finder,
    ) -> Result<Box<dyn Strategy + 'a>>;
}

/// Picks the strategy by the configuration's language tag.
#[derive(Clone)]
pub struct LanguageStrategyFactory {
    java: JavaToolchain,
}

impl LanguageStrategyFactory {
    pub fn new(java: JavaToolchain) -> Self {
        Self { java }
    }
}

impl StrategyFactory for LanguageStrategyFactory {
    fn make<'a>(
        &self,
        config: &BuildConfig,
        files: &'a [PathBuf],
        finder: &'a dyn Finder,
    ) -> Result<Box<dyn Strategy + 'a>> {
        match config.language.to_ascii_lowercase().as_str() {
            "java" | "java11" => {
                let strategy =
                    JavaStrategy::new(config.clone(), files, finder, self.java.clone());
                Ok(Box::new(strategy) as Box<dyn Strategy + 'a>)
            }
            other => bail!("no call graph strategy for language '{other}'"),
        }
    }
}
