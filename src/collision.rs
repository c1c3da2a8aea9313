use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::MigrateError;
use crate::fs_util::split_file_name;

/// Whether destination names are checked for case-only collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseMode {
    /// The host filesystem already folds case; paths pass through untouched.
    Passthrough,
    /// Reproduce case-insensitive collisions on a case-sensitive host.
    EmulateInsensitive,
}

/// Run-scoped registry of case-folded destination paths.
///
/// The first writer to a folded path keeps its name. Every later writer gets
/// `_N` inserted before the extension chain, with `N` counting up from 0 per
/// folded path.
#[derive(Debug)]
pub struct CollisionTracker {
    mode: CaseMode,
    files: HashMap<String, u32>,
    dirs: HashMap<String, Utf8PathBuf>,
}

impl CollisionTracker {
    pub fn new(mode: CaseMode) -> Self {
        Self {
            mode,
            files: HashMap::new(),
            dirs: HashMap::new(),
        }
    }

    pub fn register(&mut self, candidate: &Utf8Path) -> Result<Utf8PathBuf, MigrateError> {
        if self.mode == CaseMode::Passthrough {
            return Ok(candidate.to_path_buf());
        }

        let key = fold(candidate);
        if let Some(directory) = self.dirs.get(&key) {
            return Err(MigrateError::CaseCollision {
                file: candidate.to_path_buf(),
                directory: directory.clone(),
            });
        }

        let Some(&next) = self.files.get(&key) else {
            self.files.insert(key, 0);
            return Ok(candidate.to_path_buf());
        };

        // A synthesized name may itself already be taken by a real file.
        let mut counter = next;
        let resolved = loop {
            let synthesized = with_suffix(candidate, counter);
            counter += 1;
            let synthesized_key = fold(&synthesized);
            if !self.files.contains_key(&synthesized_key)
                && !self.dirs.contains_key(&synthesized_key)
            {
                self.files.insert(synthesized_key, 0);
                break synthesized;
            }
        };
        self.files.insert(key, counter);
        Ok(resolved)
    }

    /// Records a destination directory and its ancestors.
    pub fn register_dir(&mut self, directory: &Utf8Path) -> Result<(), MigrateError> {
        if self.mode == CaseMode::Passthrough {
            return Ok(());
        }
        for ancestor in directory.ancestors() {
            if ancestor.as_str().is_empty() {
                continue;
            }
            let key = fold(ancestor);
            if self.dirs.contains_key(&key) {
                break;
            }
            if self.files.contains_key(&key) {
                return Err(MigrateError::CaseCollision {
                    file: ancestor.to_path_buf(),
                    directory: directory.to_path_buf(),
                });
            }
            self.dirs.insert(key, ancestor.to_path_buf());
        }
        Ok(())
    }
}

fn fold(path: &Utf8Path) -> String {
    path.as_str().to_lowercase()
}

fn with_suffix(path: &Utf8Path, counter: u32) -> Utf8PathBuf {
    let file_name = path.file_name().unwrap_or_default();
    let (stem, ext) = split_file_name(file_name);
    let renamed = match ext {
        Some(ext) => format!("{stem}_{counter}.{ext}"),
        None => format!("{stem}_{counter}"),
    };
    path.with_file_name(renamed)
}
