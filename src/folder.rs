use std::collections::{BTreeSet, HashSet};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::classify::FolderPlan;
use crate::domain::AssetKind;
use crate::error::{ItemFailure, MigrateError};
use crate::store::AssetStore;

/// Open bulk-edit scope on an asset store; closed on drop.
pub struct BulkEdit<'a, S: AssetStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: AssetStore + ?Sized> BulkEdit<'a, S> {
    pub fn begin(store: &'a S) -> Self {
        store.start_asset_editing();
        Self { store }
    }

    /// Closes and reopens the scope so pending folder creation is visible.
    pub fn refresh(&self) {
        self.store.stop_asset_editing();
        self.store.start_asset_editing();
    }
}

impl<S: AssetStore + ?Sized> Drop for BulkEdit<'_, S> {
    fn drop(&mut self) {
        self.store.stop_asset_editing();
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FolderReport {
    pub root: String,
    pub moved: usize,
    pub unchanged: usize,
    pub left_at_root: usize,
    pub folders_created: Vec<String>,
    pub folders_deleted: Vec<String>,
    pub failures: Vec<ItemFailure>,
    pub finished_at: String,
}

impl FolderReport {
    fn new(root: &Utf8Path) -> Self {
        Self {
            root: root.to_string(),
            ..Self::default()
        }
    }

    fn finish(mut self) -> Self {
        self.finished_at = chrono::Utc::now().to_rfc3339();
        self
    }
}

/// Moves every placed group of `plan` into its folder under `root`.
///
/// Members already in place are left alone, so applying the same plan twice
/// moves nothing the second time.
pub fn apply_plan<S: AssetStore + ?Sized>(
    store: &S,
    root: &Utf8Path,
    plan: &FolderPlan,
) -> Result<FolderReport, MigrateError> {
    if !store.is_valid_folder(root) {
        return Err(MigrateError::MissingAssetRoot(root.to_path_buf()));
    }

    let mut report = FolderReport::new(root);
    report.left_at_root = plan.root_members();

    let scope = BulkEdit::begin(store);
    let mut visited = HashSet::new();

    'groups: for group in plan.placed_groups() {
        let Some(relative) = &group.destination else {
            continue;
        };
        info!(
            ty = %group.ty,
            members = group.members.len(),
            folder = %relative,
            "foldering group"
        );

        let mut current = root.to_path_buf();
        for segment in relative.iter() {
            let next = current.join(segment);
            if visited.insert(next.clone()) && !store.is_valid_folder(&next) {
                match store.create_folder(&current, segment) {
                    Ok(created) => {
                        debug!(folder = %created, "created folder");
                        report.folders_created.push(created.to_string());
                        scope.refresh();
                    }
                    Err(err) => {
                        error!(folder = %next, error = %err, "failed to create folder");
                        report.failures.push(ItemFailure::new(&next, &err));
                        continue 'groups;
                    }
                }
            }
            current = next;
        }

        for id in &group.members {
            let path = match store.asset_path(id) {
                Ok(path) => path,
                Err(err) => {
                    report.failures.push(ItemFailure::new(id, &err));
                    continue;
                }
            };
            let Some(file_name) = path.file_name() else {
                report
                    .failures
                    .push(ItemFailure::new(&path, "asset path has no file name"));
                continue;
            };
            let target = current.join(file_name);
            if path == target {
                report.unchanged += 1;
                continue;
            }
            match store.move_asset(&path, &target) {
                Ok(()) => report.moved += 1,
                Err(err) => {
                    error!(from = %path, to = %target, error = %err, "failed to move asset");
                    report.failures.push(ItemFailure::new(&path, &err));
                }
            }
        }
    }

    drop(scope);
    Ok(report.finish())
}

/// Flattens every `kind` asset below `root` back into `root` and deletes the
/// subfolders left behind.
///
/// A subfolder still holding an asset that failed to move is kept, so a
/// failed move never turns into a deletion.
pub fn revert_plan<S: AssetStore + ?Sized>(
    store: &S,
    root: &Utf8Path,
    kind: AssetKind,
) -> Result<FolderReport, MigrateError> {
    if !store.is_valid_folder(root) {
        return Err(MigrateError::MissingAssetRoot(root.to_path_buf()));
    }

    let records = store.find_assets(kind, root)?;
    let mut report = FolderReport::new(root);
    let mut retained = BTreeSet::new();

    let scope = BulkEdit::begin(store);

    for record in &records {
        let path = match store.asset_path(&record.id) {
            Ok(path) => path,
            Err(err) => {
                report.failures.push(ItemFailure::new(&record.id, &err));
                continue;
            }
        };
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let target = root.join(file_name);
        if path == target {
            report.unchanged += 1;
            continue;
        }
        match store.move_asset(&path, &target) {
            Ok(()) => report.moved += 1,
            Err(err) => {
                error!(from = %path, to = %target, error = %err, "failed to move asset");
                report.failures.push(ItemFailure::new(&path, &err));
                if let Some(top) = top_level_folder(root, &path) {
                    retained.insert(top);
                }
            }
        }
    }

    for folder in store.sub_folders(root)? {
        if retained.contains(&folder) {
            warn!(folder = %folder, "keeping folder with unmoved assets");
            continue;
        }
        match store.delete_asset(&folder) {
            Ok(()) => report.folders_deleted.push(folder.to_string()),
            Err(err) => {
                error!(folder = %folder, error = %err, "failed to delete folder");
                report.failures.push(ItemFailure::new(&folder, &err));
            }
        }
    }

    drop(scope);
    report.left_at_root = report.moved + report.unchanged;
    Ok(report.finish())
}

fn top_level_folder(root: &Utf8Path, path: &Utf8Path) -> Option<Utf8PathBuf> {
    let relative = path.strip_prefix(root).ok()?;
    let mut segments = relative.iter();
    let first = segments.next()?;
    // A bare file name has no folder component.
    segments.next()?;
    Some(root.join(first))
}
