//! Call-site facts for Rust codebases.
//!
//! Each source root becomes one unit. Files are parsed with `ra_ap_syntax` and types come
//! from the syntactic approximation in [`type_env`]; see that module for its limits. Calls
//! written inside macro invocations are not seen.

mod extract;
mod names;
mod type_env;

use super::{FactSource, InstrumentationApi, SourceUnit};
use crate::Result;
use camino::{Utf8Path, Utf8PathBuf};
use cargo_metadata::MetadataCommand;
use extract::CallExtractor;
use ohno::{IntoAppError, bail};
use ra_ap_syntax::{Edition, SourceFile};
use std::fs;
use type_env::{Resolver, UnitTypes};

const LOG_TARGET: &str = "rustsource";

const MAX_FILES: usize = 10_000;
const MAX_FILE_SIZE: u64 = 5_000_000; // 5MB
const MAX_DEPTH: usize = 50;

/// A directory tree of Rust files scanned as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRoot {
    pub name: String,
    pub dir: Utf8PathBuf,
}

/// Produces call-site facts by parsing Rust source trees.
#[derive(Debug, Clone)]
pub struct RustSource {
    roots: Vec<SourceRoot>,
    api: InstrumentationApi,
}

impl RustSource {
    #[must_use]
    pub const fn new(api: InstrumentationApi) -> Self {
        Self { roots: Vec::new(), api }
    }

    /// Add a source root scanned as a unit named `name`.
    #[must_use]
    pub fn with_root(mut self, name: impl Into<String>, dir: impl Into<Utf8PathBuf>) -> Self {
        self.roots.push(SourceRoot {
            name: name.into(),
            dir: dir.into(),
        });
        self
    }

    /// Add the `src/` directory of workspace packages found through `cargo metadata`.
    ///
    /// With an empty `packages` list, every workspace member is added.
    pub fn with_packages(mut self, manifest_path: &Utf8Path, packages: &[String]) -> Result<Self> {
        log::debug!(target: LOG_TARGET, "Running cargo metadata for '{manifest_path}'");
        let metadata = MetadataCommand::new()
            .manifest_path(manifest_path.as_std_path())
            .no_deps()
            .exec()
            .into_app_err_with(|| format!("retrieving workspace metadata for '{manifest_path}'"))?;

        let members = metadata.workspace_packages();

        for name in packages {
            if !members.iter().any(|p| p.name == *name) {
                bail!("package '{name}' not found in workspace");
            }
        }

        for package in members {
            if !packages.is_empty() && !packages.iter().any(|name| package.name == *name) {
                continue;
            }

            let Some(dir) = package.manifest_path.parent() else {
                continue;
            };

            log::debug!(target: LOG_TARGET, "Found package '{}' at {dir}", package.name);
            self.roots.push(SourceRoot {
                name: package.name.to_string(),
                dir: dir.join("src"),
            });
        }

        Ok(self)
    }

    fn scan_root(&self, root: &SourceRoot) -> Result<SourceUnit> {
        if !root.dir.is_dir() {
            bail!("source directory '{}' does not exist", root.dir);
        }

        let files = collect_files(&root.dir);
        log::debug!(target: LOG_TARGET, "Scanning {} source file(s) in '{}'", files.len(), root.dir);

        let mut parsed = Vec::with_capacity(files.len());
        for path in files {
            let text = fs::read_to_string(&path).into_app_err_with(|| format!("reading source file '{path}'"))?;
            let parse = SourceFile::parse(&text, Edition::CURRENT);
            if !parse.errors().is_empty() {
                log::debug!(target: LOG_TARGET, "'{path}' has {} syntax error(s), scanning what parsed", parse.errors().len());
            }

            let label = path.strip_prefix(&root.dir).unwrap_or(&path).to_string();
            parsed.push((label, text, parse.tree()));
        }

        let types = UnitTypes::collect(parsed.iter().map(|(_, _, tree)| tree));
        let resolver = Resolver::new(&types, &self.api);

        let mut call_sites = Vec::new();
        for (label, text, tree) in &parsed {
            call_sites.extend(CallExtractor::new(&resolver, label, text).extract(tree));
        }

        Ok(SourceUnit::new(root.name.clone(), call_sites))
    }
}

impl FactSource for RustSource {
    fn describe(&self) -> String {
        match self.roots.as_slice() {
            [root] => format!("Rust sources in '{}'", root.dir),
            roots => format!("Rust sources in {} package(s)", roots.len()),
        }
    }

    fn load_units(&self) -> Result<Vec<SourceUnit>> {
        self.roots.iter().map(|root| self.scan_root(root)).collect()
    }

    fn api(&self) -> &InstrumentationApi {
        &self.api
    }
}

/// Rust files under `dir` in a stable order, skipping build output and hidden directories.
fn collect_files(dir: &Utf8Path) -> Vec<Utf8PathBuf> {
    let files: Vec<_> = walkdir::WalkDir::new(dir)
        .follow_links(false)
        .max_depth(MAX_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e))
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::debug!(target: LOG_TARGET, "Could not walk directory: {err:#}");
                None
            }
        })
        .filter(|e| !e.file_type().is_dir())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .take(MAX_FILES)
        .filter_map(|entry| {
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    log::debug!(target: LOG_TARGET, "Could not read metadata for {}: {e:#}", entry.path().display());
                    return None;
                }
            };

            if metadata.len() > MAX_FILE_SIZE {
                log::debug!(target: LOG_TARGET, "Skipping large file '{}' ({} bytes)", entry.path().display(), metadata.len());
                return None;
            }

            match Utf8PathBuf::try_from(entry.into_path()) {
                Ok(path) => Some(path),
                Err(e) => {
                    log::debug!(target: LOG_TARGET, "Skipping non UTF-8 path '{}'", e.as_path().display());
                    None
                }
            }
        })
        .collect();

    if files.len() == MAX_FILES {
        log::debug!(target: LOG_TARGET, "File count limit ({MAX_FILES}) reached in {dir}, some files may not be scanned");
    }

    files
}

fn is_skipped_dir(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name == "target" || name.starts_with('.'))
}
