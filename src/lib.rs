//! # callgraph-gen
//!
//! Discovers Maven and Gradle project roots in a file tree, stages each
//! root's dependencies and runs an external call graph generator per root.
//!
//! ## Architecture
//!
//! - **finder**: File discovery, root and class-directory matching
//! - **strategy**: Build-configuration to job translation
//! - **java**: Java jobs and the strategy that creates them
//! - **job**: Job trait, error collector and status stream
//! - **scheduler**: Sequential or pooled job execution with progress
//! - **generation**: Ordered results of one scheduling pass
//! - **generator**: The full pipeline and its timed variant
//! - **cmd** / **pip**: Builders for the external commands
//! - **exec**: Cancellable subprocess execution
//! - **staging** / **gradle**: Dependency staging helpers
//! - **progress**: Per-job progress indicators
//! - **config** / **cli**: Configuration file and command line

pub mod cancel;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod exec;
pub mod finder;
pub mod generation;
pub mod generator;
pub mod gradle;
pub mod java;
pub mod job;
pub mod logging;
pub mod pip;
pub mod progress;
pub mod scheduler;
pub mod staging;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;
