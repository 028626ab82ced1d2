//! File discovery and root matching.
//!
//! Everything here works on plain path lists so the strategy can be fed
//! canned inputs. Prefix comparisons are always cut at a path separator:
//! `/a/p` owns `/a/p/target/classes/` but never `/a/pq/target/classes/`.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{WalkBuilder, WalkState};
use std::collections::{BTreeMap, HashSet};
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::cancel::CancellationToken;
use crate::config::BuildSystem;

pub const MAVEN_DESCRIPTORS: &[&str] = &["pom.xml"];
pub const GRADLE_DESCRIPTORS: &[&str] = &[
    "build.gradle",
    "build.gradle.kts",
    "settings.gradle",
    "settings.gradle.kts",
];
pub const CLASS_EXTENSION: &str = "class";

/// Discovery operations the strategy and generator depend on.
pub trait Finder: Send + Sync {
    fn find_files(
        &self,
        paths: &[PathBuf],
        exclusions: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<PathBuf>>;

    fn find_roots(&self, build_system: BuildSystem, files: &[PathBuf]) -> Result<Vec<PathBuf>>;

    fn find_java_class_dirs(&self, files: &[PathBuf]) -> Vec<PathBuf>;
}

/// Filesystem-backed [`Finder`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFinder;

impl Finder for FileFinder {
    fn find_files(
        &self,
        paths: &[PathBuf],
        exclusions: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<PathBuf>> {
        find_files(paths, exclusions, cancel)
    }

    fn find_roots(&self, build_system: BuildSystem, files: &[PathBuf]) -> Result<Vec<PathBuf>> {
        find_roots(build_system, files)
    }

    fn find_java_class_dirs(&self, files: &[PathBuf]) -> Vec<PathBuf> {
        find_java_class_dirs(files)
    }
}

pub fn default_exclusions() -> Vec<String> {
    ["node_modules", "vendor", ".git", "obj"]
        .iter()
        .map(|dir| format!("**/{dir}/**"))
        .collect()
}

/// Recursively lists regular files below every path, skipping excluded ones.
pub fn find_files<P: AsRef<Path>>(
    paths: &[P],
    exclusions: &[String],
    cancel: &CancellationToken,
) -> Result<Vec<PathBuf>> {
    let excluded = build_glob_set(exclusions)?;
    let mut files = Vec::new();
    for path in paths {
        files.extend(walk(path.as_ref(), &excluded, cancel)?);
    }
    debug!(count = files.len(), "discovered files");
    Ok(files)
}

fn walk(base: &Path, excluded: &GlobSet, cancel: &CancellationToken) -> Result<Vec<PathBuf>> {
    let (tx, rx) = mpsc::channel();
    let failure: Arc<Mutex<Option<ignore::Error>>> = Arc::new(Mutex::new(None));
    let filter = excluded.clone();

    let walker = WalkBuilder::new(base)
        .hidden(false)
        .ignore(false)
        .parents(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .filter_entry(move |entry| !is_excluded(&filter, entry.path()))
        .build_parallel();

    walker.run(|| {
        let tx = tx.clone();
        let failure = Arc::clone(&failure);
        let cancel = cancel.clone();
        Box::new(move |entry| {
            if cancel.is_cancelled() {
                return WalkState::Quit;
            }
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_some_and(|t| t.is_file()) {
                        let _ = tx.send(entry.into_path());
                    }
                    WalkState::Continue
                }
                Err(err) => {
                    if let Ok(mut slot) = failure.lock() {
                        slot.get_or_insert(err);
                    }
                    WalkState::Quit
                }
            }
        })
    });

    drop(tx);
    let files: Vec<PathBuf> = rx.iter().collect();

    if cancel.is_cancelled() {
        anyhow::bail!("file discovery under {} was cancelled", base.display());
    }
    let failure = failure.lock().ok().and_then(|mut slot| slot.take());
    if let Some(err) = failure {
        return Err(err).with_context(|| format!("Failed to walk {}", base.display()));
    }
    Ok(files)
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).with_context(|| format!("Invalid exclusion pattern: {pattern}"))?;
        builder.add(glob);
    }
    builder.build().context("Failed to compile exclusion patterns")
}

fn is_excluded(set: &GlobSet, path: &Path) -> bool {
    if set.is_empty() {
        return false;
    }
    set.is_match(path) || path.file_name().is_some_and(|name| set.is_match(name))
}

/// Keeps the files whose base name matches `pattern`.
pub fn filter_files<P: AsRef<Path>>(files: &[P], pattern: &str) -> Result<Vec<PathBuf>> {
    let matcher = Glob::new(pattern)
        .with_context(|| format!("Invalid file pattern: {pattern}"))?
        .compile_matcher();
    Ok(files
        .iter()
        .map(|f| f.as_ref())
        .filter(|f| f.file_name().is_some_and(|name| matcher.is_match(name)))
        .map(Path::to_path_buf)
        .collect())
}

pub fn find_roots<P: AsRef<Path>>(build_system: BuildSystem, files: &[P]) -> Result<Vec<PathBuf>> {
    match build_system {
        BuildSystem::Gradle => find_gradle_roots(files),
        BuildSystem::Maven | BuildSystem::Unspecified => find_maven_roots(files),
    }
}

pub fn find_maven_roots<P: AsRef<Path>>(files: &[P]) -> Result<Vec<PathBuf>> {
    descriptor_dirs(files, MAVEN_DESCRIPTORS)
}

pub fn find_gradle_roots<P: AsRef<Path>>(files: &[P]) -> Result<Vec<PathBuf>> {
    descriptor_dirs(files, GRADLE_DESCRIPTORS)
}

fn descriptor_dirs<P: AsRef<Path>>(files: &[P], descriptors: &[&str]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut roots = Vec::new();
    for file in files {
        let file = file.as_ref();
        let Some(name) = file.file_name() else {
            continue;
        };
        if !descriptors.iter().any(|d| name == *d) {
            continue;
        }
        let dir = containing_dir(file);
        let root = std::path::absolute(&dir)
            .with_context(|| format!("Failed to resolve project root {}", dir.display()))?;
        if seen.insert(root.clone()) {
            roots.push(root);
        }
    }
    Ok(roots)
}

/// Distinct absolute directories holding `.class` files, separator-terminated.
pub fn find_java_class_dirs<P: AsRef<Path>>(files: &[P]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut dirs = Vec::new();
    for file in files {
        let file = file.as_ref();
        if !file.extension().is_some_and(|e| e == CLASS_EXTENSION) {
            continue;
        }
        let dir = containing_dir(file);
        let abs = match std::path::absolute(&dir) {
            Ok(abs) => abs,
            Err(err) => {
                debug!(dir = %dir.display(), error = %err, "skipping class directory");
                continue;
            }
        };
        let dir = with_trailing_separator(&abs);
        if seen.insert(dir.clone()) {
            dirs.push(dir);
        }
    }
    dirs
}

fn containing_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

pub fn with_trailing_separator(dir: &Path) -> PathBuf {
    let mut raw = dir.as_os_str().to_os_string();
    if !dir.to_string_lossy().ends_with(MAIN_SEPARATOR) {
        raw.push(MAIN_SEPARATOR.to_string());
    }
    PathBuf::from(raw)
}

/// Assigns each file to the directory with the longest separator-aligned
/// prefix of it. Ties go to the earlier directory; orphans are dropped.
pub fn map_files_to_dir<D: AsRef<Path>, F: AsRef<Path>>(
    dirs: &[D],
    files: &[F],
) -> BTreeMap<PathBuf, Vec<PathBuf>> {
    let mut mapping: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    if dirs.is_empty() {
        return mapping;
    }

    let dir_keys: Vec<String> = dirs
        .iter()
        .map(|d| d.as_ref().to_string_lossy().to_string())
        .collect();

    for file in files {
        let file = file.as_ref();
        let key = file.to_string_lossy();
        let mut best: Option<(usize, usize)> = None;
        for (idx, dir) in dir_keys.iter().enumerate() {
            let Some(len) = aligned_prefix_len(dir, &key) else {
                continue;
            };
            if best.is_none_or(|(best_len, _)| len > best_len) {
                best = Some((len, idx));
            }
        }
        if let Some((_, idx)) = best {
            mapping
                .entry(dirs[idx].as_ref().to_path_buf())
                .or_default()
                .push(file.to_path_buf());
        }
    }

    mapping
}

fn aligned_prefix_len(dir: &str, file: &str) -> Option<usize> {
    let dir = dir.trim_end_matches(MAIN_SEPARATOR);
    let rest = file.strip_prefix(dir)?;
    if rest.is_empty() || rest.starts_with(MAIN_SEPARATOR) {
        Some(dir.len())
    } else {
        None
    }
}

/// Deepest separator-terminated prefix shared by every path, or `""`.
///
/// A bare leading separator (the filesystem root) is not a shared ancestor,
/// so a path directly below the root, such as `/a`, yields `""` as well.
pub fn gcd_path<P: AsRef<Path>>(paths: &[P]) -> String {
    let paths: Vec<String> = paths
        .iter()
        .map(|p| p.as_ref().to_string_lossy().to_string())
        .collect();
    let Some(shortest) = paths.iter().min_by_key(|p| p.len()) else {
        return String::new();
    };

    let mut result = String::new();
    for (i, c) in shortest.char_indices() {
        if c != MAIN_SEPARATOR || i == 0 {
            continue;
        }
        let prefix = &shortest[..i + c.len_utf8()];
        if !paths.iter().all(|p| p.starts_with(prefix)) {
            return result;
        }
        result = prefix.to_string();
    }
    result
}
