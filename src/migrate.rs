use std::collections::{BTreeSet, HashSet};
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::collision::{CaseMode, CollisionTracker};
use crate::config::ResolvedConfig;
use crate::error::{ItemFailure, MigrateError};
use crate::fs_util::{list_subdirs, walk_files};
use crate::mapping::MappingResolver;

#[derive(Debug, Clone)]
pub struct MigrationOptions {
    /// Categories owned by other steps, never copied here.
    pub excluded_categories: BTreeSet<String>,
    pub minimal_copy: bool,
    /// Destinations skipped when `minimal_copy` is set.
    pub minimal_exclusions: Vec<Utf8PathBuf>,
    pub case_mode: CaseMode,
}

impl MigrationOptions {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self {
            excluded_categories: config.excluded_categories.clone(),
            minimal_copy: config.minimal_copy,
            minimal_exclusions: config.minimal_exclusions.clone(),
            case_mode: config.case_mode,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Excluded,
    Unmapped,
    Minimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCategory {
    pub category: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryResult {
    pub category: String,
    pub destination: String,
    pub files: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    pub source_root: String,
    pub destination_root: String,
    pub categories: Vec<CategoryResult>,
    pub skipped: Vec<SkippedCategory>,
    pub copied: usize,
    /// Files that received a collision suffix.
    pub renamed: usize,
    pub failures: Vec<ItemFailure>,
    pub finished_at: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanReport {
    pub root: String,
    pub deleted: usize,
    pub kept: usize,
    pub failures: Vec<ItemFailure>,
    pub finished_at: String,
}

pub struct Migrator<'a> {
    resolver: &'a MappingResolver,
    options: &'a MigrationOptions,
}

impl<'a> Migrator<'a> {
    pub fn new(resolver: &'a MappingResolver, options: &'a MigrationOptions) -> Self {
        Self { resolver, options }
    }

    /// Copies every mapped category below `source_root` into
    /// `destination_root`.
    ///
    /// Categories and files are visited in lexicographic order, so collision
    /// suffixes are reproducible for an unchanged source tree.
    pub fn run(
        &self,
        source_root: &Utf8Path,
        destination_root: &Utf8Path,
    ) -> Result<MigrationReport, MigrateError> {
        if !source_root.as_std_path().is_dir() {
            return Err(MigrateError::MissingSourceRoot(source_root.to_path_buf()));
        }

        let mut report = MigrationReport {
            source_root: source_root.to_string(),
            destination_root: destination_root.to_string(),
            ..MigrationReport::default()
        };
        let mut tracker = CollisionTracker::new(self.options.case_mode);
        let mut created_dirs = HashSet::new();

        for category_dir in list_subdirs(source_root)? {
            let Some(category) = category_dir.file_name().map(str::to_string) else {
                continue;
            };

            let destination = match self.category_destination(&category) {
                Ok(destination) => destination,
                Err(reason) => {
                    debug!(%category, ?reason, "skipping category");
                    report.skipped.push(SkippedCategory { category, reason });
                    continue;
                }
            };

            let destination_dir = destination_root.join(destination);
            let files = self.copy_category(
                &category_dir,
                &destination_dir,
                &mut tracker,
                &mut created_dirs,
                &mut report,
            )?;
            info!(%category, destination = %destination, files, "migrated category");
            report.categories.push(CategoryResult {
                category,
                destination: destination.to_string(),
                files,
            });
        }

        report.finished_at = chrono::Utc::now().to_rfc3339();
        Ok(report)
    }

    fn category_destination(&self, category: &str) -> Result<&'a Utf8Path, SkipReason> {
        if self.options.excluded_categories.contains(category) {
            return Err(SkipReason::Excluded);
        }
        let destination = self
            .resolver
            .resolve(category)
            .map(Utf8PathBuf::as_path)
            .ok_or(SkipReason::Unmapped)?;
        if self.options.minimal_copy
            && self
                .options
                .minimal_exclusions
                .iter()
                .any(|excluded| excluded == destination)
        {
            return Err(SkipReason::Minimal);
        }
        Ok(destination)
    }

    fn copy_category(
        &self,
        category_dir: &Utf8Path,
        destination_dir: &Utf8Path,
        tracker: &mut CollisionTracker,
        created_dirs: &mut HashSet<Utf8PathBuf>,
        report: &mut MigrationReport,
    ) -> Result<usize, MigrateError> {
        let mut copied = 0;
        for file in walk_files(category_dir)? {
            let Ok(relative) = file.strip_prefix(category_dir) else {
                continue;
            };
            let candidate = destination_dir.join(relative);

            if let Some(parent) = candidate.parent()
                && !created_dirs.contains(parent)
            {
                if let Err(err) = tracker.register_dir(parent) {
                    error!(error = %err, "destination directory collides with a file");
                    report.failures.push(ItemFailure::new(&file, &err));
                    continue;
                }
                if let Err(err) = fs::create_dir_all(parent.as_std_path()) {
                    error!(dir = %parent, error = %err, "failed to create directory");
                    report.failures.push(ItemFailure::new(&file, &err));
                    continue;
                }
                created_dirs.insert(parent.to_path_buf());
            }

            let target = match tracker.register(&candidate) {
                Ok(target) => target,
                Err(err) => {
                    error!(error = %err, "case-insensitive name collision");
                    report.failures.push(ItemFailure::new(&file, &err));
                    continue;
                }
            };
            if target != candidate {
                debug!(from = %candidate, to = %target, "renamed colliding file");
                report.renamed += 1;
            }

            match fs::copy(file.as_std_path(), target.as_std_path()) {
                Ok(_) => {
                    copied += 1;
                    report.copied += 1;
                }
                Err(err) => {
                    error!(from = %file, to = %target, error = %err, "failed to copy file");
                    report.failures.push(ItemFailure::new(&file, &err));
                }
            }
        }
        Ok(copied)
    }
}

/// Deletes every file below `root` except `.dll` files.
pub fn clean(root: &Utf8Path) -> Result<CleanReport, MigrateError> {
    let mut report = CleanReport {
        root: root.to_string(),
        ..CleanReport::default()
    };
    if !root.as_std_path().is_dir() {
        report.finished_at = chrono::Utc::now().to_rfc3339();
        return Ok(report);
    }

    for file in walk_files(root)? {
        let is_dll = file
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("dll"))
            .unwrap_or(false);
        if is_dll {
            report.kept += 1;
            continue;
        }
        match fs::remove_file(file.as_std_path()) {
            Ok(()) => report.deleted += 1,
            Err(err) => {
                warn!(path = %file, error = %err, "could not delete file");
                report.failures.push(ItemFailure::new(&file, &err));
            }
        }
    }

    report.finished_at = chrono::Utc::now().to_rfc3339();
    Ok(report)
}
