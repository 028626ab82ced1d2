use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::BuildSystem;

#[derive(Debug, Clone, Parser)]
#[command(name = "callgraph-gen")]
#[command(about = "Find Maven/Gradle project roots and generate a call graph for each of them")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON configuration file; command-line flags take precedence.
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Call graph generator jar passed to `java -jar`.
    #[arg(long, value_name = "FILE", global = true)]
    pub tool_jar: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Stage dependencies and generate a call graph for every discovered root.
    Generate {
        #[command(flatten)]
        discovery: DiscoveryArgs,

        /// Seconds before the whole run is cancelled.
        #[arg(short = 't', long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Jobs run concurrently when greater than one.
        #[arg(short = 'w', long, value_name = "N")]
        workers: Option<usize>,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,

        /// Log progress instead of drawing status lines.
        #[arg(long)]
        no_progress: bool,
    },
    /// List discovered roots and the class directories each one owns.
    Roots {
        #[command(flatten)]
        discovery: DiscoveryArgs,

        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct DiscoveryArgs {
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Glob of paths to skip; may be repeated.
    #[arg(short = 'e', long = "exclusion", value_name = "GLOB")]
    pub exclusions: Vec<String>,

    /// Build system used to locate project roots.
    #[arg(long, value_enum, value_name = "PM")]
    pub pm: Option<PmArg>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum PmArg {
    Maven,
    Gradle,
}

impl From<PmArg> for BuildSystem {
    fn from(value: PmArg) -> Self {
        match value {
            PmArg::Maven => BuildSystem::Maven,
            PmArg::Gradle => BuildSystem::Gradle,
        }
    }
}

#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
