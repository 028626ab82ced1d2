use anyhow::Result;
use callgraph_gen::cancel::CancellationToken;
use callgraph_gen::cli::{Cli, Commands, OutputFormat};
use callgraph_gen::cmd::JavaCmdFactory;
use callgraph_gen::config::{GeneratorConfig, resolve_config, resolve_tool_jar};
use callgraph_gen::finder::{
    FileFinder, find_files, find_java_class_dirs, find_roots, gcd_path, map_files_to_dir,
};
use callgraph_gen::generation::JobSummary;
use callgraph_gen::generator::Generator;
use callgraph_gen::java::JavaToolchain;
use callgraph_gen::logging::init_tracing;
use callgraph_gen::progress::{ProgressBoard, ProgressMode};
use callgraph_gen::scheduler::Scheduler;
use callgraph_gen::staging::staging_exclusion;
use callgraph_gen::strategy::LanguageStrategyFactory;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

const TIMEOUT_EXIT: u8 = 2;

fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command.clone() {
        Commands::Generate {
            discovery,
            timeout,
            workers,
            format,
            no_progress,
        } => {
            let mut config = resolve_config(&cli, &discovery)?;
            if let Some(secs) = timeout {
                config.timeout_secs = secs;
            }
            if let Some(workers) = workers {
                config.workers = workers;
            }
            let tool_jar = resolve_tool_jar(&config)?;
            run_generate(&config, tool_jar, format, no_progress)
        }
        Commands::Roots { discovery, format } => {
            let config = resolve_config(&cli, &discovery)?;
            let roots = list_roots(&config)?;
            write_output(&render_roots(&roots, format)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateReport {
    jobs: usize,
    failed: usize,
    duration_ms: u64,
    results: Vec<JobSummary>,
}

#[derive(Debug, Serialize)]
struct RootReport {
    build_system: String,
    root: String,
    entrypoint: Option<String>,
    class_dirs: Vec<String>,
}

fn run_generate(
    config: &GeneratorConfig,
    tool_jar: PathBuf,
    format: OutputFormat,
    no_progress: bool,
) -> Result<ExitCode> {
    let toolchain = JavaToolchain::new(Arc::new(JavaCmdFactory::new()), tool_jar);
    let mode = if no_progress {
        ProgressMode::Log
    } else {
        ProgressMode::Terminal
    };
    let generator = Generator::new(
        Arc::new(FileFinder),
        Arc::new(LanguageStrategyFactory::new(toolchain)),
        Scheduler::new(config.workers).with_progress(ProgressBoard::new(mode)),
    );

    let start = Instant::now();
    let generation = match generator.generate_with_timer(
        &config.paths,
        &config.exclusions,
        &config.builds,
        config.timeout(),
    ) {
        Ok(generation) => generation,
        Err(err) if err.is_timeout() => {
            eprintln!("[callgraph-gen] {err}");
            return Ok(ExitCode::from(TIMEOUT_EXIT));
        }
        Err(err) => return Err(err.into()),
    };

    let report = GenerateReport {
        jobs: generation.len(),
        failed: generation.failed_count(),
        duration_ms: start.elapsed().as_millis() as u64,
        results: generation.summary(),
    };
    write_output(&render_report(&report, format)?);

    Ok(if generation.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn list_roots(config: &GeneratorConfig) -> Result<Vec<RootReport>> {
    let mut exclusions = config.exclusions.clone();
    exclusions.push(staging_exclusion());
    let files = find_files(&config.paths, &exclusions, &CancellationToken::new())?;
    let class_dirs = find_java_class_dirs(&files);

    let mut reports = Vec::new();
    for build in &config.builds {
        let build_system = build.build_system();
        let mut roots = find_roots(build_system, &files)?;
        roots.sort();
        let mapping = map_files_to_dir(&roots, &class_dirs);

        for root in roots {
            let owned = mapping.get(&root).cloned().unwrap_or_default();
            let entrypoint = (!owned.is_empty()).then(|| gcd_path(&owned));
            reports.push(RootReport {
                build_system: build_system.to_string(),
                root: root.to_string_lossy().to_string(),
                entrypoint,
                class_dirs: owned
                    .iter()
                    .map(|d| d.to_string_lossy().to_string())
                    .collect(),
            });
        }
    }
    Ok(reports)
}

fn render_report(report: &GenerateReport, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)?,
        OutputFormat::Text => {
            let mut out = String::new();
            out.push_str(&format!("jobs: {}\n", report.jobs));
            out.push_str(&format!("failed: {}\n", report.failed));
            out.push_str(&format!("duration_ms: {}\n", report.duration_ms));
            for job in &report.results {
                out.push_str(&format!(
                    "- root: {}, state: {:?}, targets: {}\n",
                    job.dir,
                    job.state,
                    job.targets.join(", ")
                ));
                for err in &job.errors {
                    out.push_str(&format!("  error: {err}\n"));
                }
            }
            out
        }
    })
}

fn render_roots(roots: &[RootReport], format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(roots)?,
        OutputFormat::Text => {
            let mut out = String::new();
            for root in roots {
                out.push_str(&format!("{} ({})\n", root.root, root.build_system));
                for dir in &root.class_dirs {
                    out.push_str(&format!("  - {dir}\n"));
                }
            }
            out
        }
    })
}

fn write_output(content: &str) {
    print!("{content}");
    if !content.ends_with('\n') {
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callgraph_gen::job::JobState;

    #[test]
    fn text_report_lists_errors_under_their_root() {
        let report = GenerateReport {
            jobs: 1,
            failed: 1,
            duration_ms: 12,
            results: vec![JobSummary {
                dir: "/p".into(),
                targets: vec!["/p/target/classes/".into()],
                state: JobState::Failed,
                ok: false,
                errors: vec!["dependency staging: mvn exited with 1".into()],
            }],
        };

        let text = render_report(&report, OutputFormat::Text).unwrap();
        assert!(text.contains("- root: /p, state: Failed, targets: /p/target/classes/"));
        assert!(text.contains("  error: dependency staging: mvn exited with 1"));
    }

    #[test]
    fn text_roots_lists_class_dirs() {
        let roots = vec![RootReport {
            build_system: "maven".into(),
            root: "/p".into(),
            entrypoint: Some("/p/target/classes/".into()),
            class_dirs: vec!["/p/target/classes/".into()],
        }];
        let text = render_roots(&roots, OutputFormat::Text).unwrap();
        assert_eq!(text, "/p (maven)\n  - /p/target/classes/\n");
    }
}
