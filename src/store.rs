use std::collections::BTreeMap;
use std::fs;
use std::sync::{Mutex, MutexGuard, PoisonError};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{AssetId, AssetKind, AssetRecord, RecordType, TypeDefinition, TypeTable};
use crate::error::MigrateError;
use crate::fs_util::{list_subdirs, meta_path, write_bytes_atomic};

/// Asset database capability the sorting code runs against.
///
/// Paths are absolute. Editing scopes nest; implementations may defer any
/// indexing work until the outermost scope closes.
pub trait AssetStore {
    fn find_assets(
        &self,
        kind: AssetKind,
        folder: &Utf8Path,
    ) -> Result<Vec<AssetRecord>, MigrateError>;
    fn asset_path(&self, id: &AssetId) -> Result<Utf8PathBuf, MigrateError>;
    fn move_asset(&self, from: &Utf8Path, to: &Utf8Path) -> Result<(), MigrateError>;
    fn delete_asset(&self, path: &Utf8Path) -> Result<(), MigrateError>;
    fn create_folder(&self, parent: &Utf8Path, name: &str) -> Result<Utf8PathBuf, MigrateError>;
    fn is_valid_folder(&self, path: &Utf8Path) -> bool;
    fn sub_folders(&self, path: &Utf8Path) -> Result<Vec<Utf8PathBuf>, MigrateError>;
    fn start_asset_editing(&self);
    fn stop_asset_editing(&self);
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetManifest {
    #[serde(default)]
    pub types: Vec<TypeDefinition>,
    #[serde(default)]
    pub assets: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Relative to the store root.
    pub path: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
struct StoredAsset {
    record: AssetRecord,
    path: Utf8PathBuf,
}

#[derive(Debug, Default)]
struct StoreState {
    assets: BTreeMap<AssetId, StoredAsset>,
    editing_depth: usize,
}

/// Filesystem-backed asset store indexed by a JSON manifest.
#[derive(Debug)]
pub struct FsAssetStore {
    root: Utf8PathBuf,
    manifest_path: Option<Utf8PathBuf>,
    types: Vec<TypeDefinition>,
    state: Mutex<StoreState>,
}

impl FsAssetStore {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self {
            root,
            manifest_path: None,
            types: Vec::new(),
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn open(root: Utf8PathBuf, manifest_path: Utf8PathBuf) -> Result<Self, MigrateError> {
        let content = fs::read_to_string(manifest_path.as_std_path())
            .map_err(|err| MigrateError::Filesystem(format!("read {manifest_path}: {err}")))?;
        let manifest: AssetManifest = serde_json::from_str(&content)
            .map_err(|err| MigrateError::ManifestParse(err.to_string()))?;
        let mut store = Self::from_manifest(root, manifest)?;
        store.manifest_path = Some(manifest_path);
        Ok(store)
    }

    pub fn from_manifest(root: Utf8PathBuf, manifest: AssetManifest) -> Result<Self, MigrateError> {
        let table = TypeTable::build(&manifest.types)?;
        let store = Self {
            types: manifest.types,
            ..Self::new(root)
        };
        for entry in manifest.assets {
            let id = entry.id.clone().unwrap_or_else(|| entry.path.clone());
            let ty = match (&entry.type_name, &entry.components) {
                (Some(name), None) => RecordType::Simple(table.get(name)?),
                (None, Some(components)) => RecordType::Composite(
                    components
                        .iter()
                        .map(|name| table.get(name))
                        .collect::<Result<Vec<_>, _>>()?,
                ),
                _ => {
                    return Err(MigrateError::ManifestParse(format!(
                        "asset {} needs exactly one of `type` or `components`",
                        entry.path
                    )));
                }
            };
            let path = store.root.join(&entry.path);
            store.register(
                AssetRecord {
                    id: AssetId::new(id),
                    ty,
                },
                path,
            );
        }
        Ok(store)
    }

    pub fn register(&self, record: AssetRecord, path: Utf8PathBuf) {
        self.lock()
            .assets
            .insert(record.id.clone(), StoredAsset { record, path });
    }

    pub fn editing_depth(&self) -> usize {
        self.lock().editing_depth
    }

    /// Writes current asset locations back to the manifest it was opened from.
    pub fn persist(&self) -> Result<(), MigrateError> {
        match &self.manifest_path {
            Some(path) => self.save_manifest(path),
            None => Ok(()),
        }
    }

    pub fn save_manifest(&self, path: &Utf8Path) -> Result<(), MigrateError> {
        let state = self.lock();
        let assets = state
            .assets
            .values()
            .map(|stored| {
                let relative = stored
                    .path
                    .strip_prefix(&self.root)
                    .unwrap_or(&stored.path)
                    .to_string();
                let (type_name, components) = match &stored.record.ty {
                    RecordType::Simple(ty) => (Some(ty.full_name()), None),
                    RecordType::Composite(components) => (
                        None,
                        Some(components.iter().map(|ty| ty.full_name()).collect()),
                    ),
                };
                let id = stored.record.id.as_str();
                ManifestEntry {
                    id: (id != relative).then(|| id.to_string()),
                    path: relative,
                    type_name,
                    components,
                }
            })
            .collect();
        let manifest = AssetManifest {
            types: self.types.clone(),
            assets,
        };
        let content = serde_json::to_vec_pretty(&manifest)
            .map_err(|err| MigrateError::Filesystem(err.to_string()))?;
        write_bytes_atomic(path, &content)
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AssetStore for FsAssetStore {
    fn find_assets(
        &self,
        kind: AssetKind,
        folder: &Utf8Path,
    ) -> Result<Vec<AssetRecord>, MigrateError> {
        if !folder.as_std_path().is_dir() {
            return Err(MigrateError::MissingAssetRoot(folder.to_path_buf()));
        }
        let state = self.lock();
        let mut found = state
            .assets
            .values()
            .filter(|stored| stored.record.kind() == kind && stored.path.starts_with(folder))
            .filter(|stored| {
                let exists = stored.path.as_std_path().is_file();
                if !exists {
                    debug!(path = %stored.path, "skipping asset with no file on disk");
                }
                exists
            })
            .map(|stored| (stored.path.clone(), stored.record.clone()))
            .collect::<Vec<_>>();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found.into_iter().map(|(_, record)| record).collect())
    }

    fn asset_path(&self, id: &AssetId) -> Result<Utf8PathBuf, MigrateError> {
        self.lock()
            .assets
            .get(id)
            .map(|stored| stored.path.clone())
            .ok_or_else(|| MigrateError::UnknownAsset(id.to_string()))
    }

    fn move_asset(&self, from: &Utf8Path, to: &Utf8Path) -> Result<(), MigrateError> {
        let move_err = |message: String| MigrateError::MoveAsset {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            message,
        };

        let mut state = self.lock();
        let id = state
            .assets
            .iter()
            .find(|(_, stored)| stored.path == from)
            .map(|(id, _)| id.clone())
            .ok_or_else(|| MigrateError::UnknownAsset(from.to_string()))?;

        if to.as_std_path().exists() {
            return Err(move_err("destination already exists".to_string()));
        }
        let parent_exists = to
            .parent()
            .map(|parent| parent.as_std_path().is_dir())
            .unwrap_or(false);
        if !parent_exists {
            return Err(move_err("destination folder does not exist".to_string()));
        }

        fs::rename(from.as_std_path(), to.as_std_path()).map_err(|err| move_err(err.to_string()))?;
        if let Some(stored) = state.assets.get_mut(&id) {
            stored.path = to.to_path_buf();
        }

        let from_meta = meta_path(from);
        if from_meta.as_std_path().is_file()
            && let Err(err) = fs::rename(from_meta.as_std_path(), meta_path(to).as_std_path())
        {
            warn!(path = %from_meta, error = %err, "failed to move sidecar");
        }
        debug!(%from, %to, "moved asset");
        Ok(())
    }

    fn delete_asset(&self, path: &Utf8Path) -> Result<(), MigrateError> {
        let delete_err = |message: String| MigrateError::DeleteAsset {
            path: path.to_path_buf(),
            message,
        };

        let std_path = path.as_std_path();
        if std_path.is_dir() {
            fs::remove_dir_all(std_path).map_err(|err| delete_err(err.to_string()))?;
        } else if std_path.is_file() {
            fs::remove_file(std_path).map_err(|err| delete_err(err.to_string()))?;
        } else {
            return Err(delete_err("no such asset".to_string()));
        }

        let meta = meta_path(path);
        if meta.as_std_path().is_file()
            && let Err(err) = fs::remove_file(meta.as_std_path())
        {
            warn!(path = %meta, error = %err, "failed to remove sidecar");
        }

        self.lock()
            .assets
            .retain(|_, stored| !stored.path.starts_with(path));
        Ok(())
    }

    fn create_folder(&self, parent: &Utf8Path, name: &str) -> Result<Utf8PathBuf, MigrateError> {
        let folder = parent.join(name);
        if !parent.as_std_path().is_dir() {
            return Err(MigrateError::CreateFolder {
                parent: parent.to_path_buf(),
                name: name.to_string(),
                message: "parent folder does not exist".to_string(),
            });
        }
        if !folder.as_std_path().is_dir() {
            fs::create_dir(folder.as_std_path()).map_err(|err| MigrateError::CreateFolder {
                parent: parent.to_path_buf(),
                name: name.to_string(),
                message: err.to_string(),
            })?;
        }
        Ok(folder)
    }

    fn is_valid_folder(&self, path: &Utf8Path) -> bool {
        path.as_std_path().is_dir()
    }

    fn sub_folders(&self, path: &Utf8Path) -> Result<Vec<Utf8PathBuf>, MigrateError> {
        list_subdirs(path)
    }

    fn start_asset_editing(&self) {
        self.lock().editing_depth += 1;
    }

    fn stop_asset_editing(&self) {
        let mut state = self.lock();
        match state.editing_depth {
            0 => warn!("stop_asset_editing called without a matching start"),
            depth => {
                state.editing_depth = depth - 1;
                if state.editing_depth == 0 {
                    debug!(assets = state.assets.len(), "asset editing finished");
                }
            }
        }
    }
}
