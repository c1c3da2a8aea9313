#![allow(dead_code)]

use std::fs;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};

use asset_migrate::domain::{AssetId, AssetKind, AssetRecord};
use asset_migrate::error::MigrateError;
use asset_migrate::store::{AssetManifest, AssetStore, FsAssetStore};

pub fn utf8_tempdir() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

pub fn write_file(path: &Utf8Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent.as_std_path()).unwrap();
    }
    fs::write(path.as_std_path(), content).unwrap();
}

/// Relative paths of every file below `root`, sorted.
pub fn tree(root: &Utf8Path) -> Vec<String> {
    asset_migrate::fs_util::walk_files(root)
        .unwrap()
        .into_iter()
        .map(|path| path.strip_prefix(root).unwrap().to_string())
        .collect()
}

pub const TYPES: &str = r#"[
    {"name": "UnityEngine.Component"},
    {"name": "UnityEngine.Transform", "base": "UnityEngine.Component"},
    {"name": "UnityEngine.Light", "base": "UnityEngine.Component"},
    {"name": "UnityEngine.MonoBehaviour", "base": "UnityEngine.Component"},
    {"name": "EnemyAI", "base": "UnityEngine.MonoBehaviour"},
    {"name": "CrawlerAI", "base": "EnemyAI"},
    {"name": "FlowermanAI", "base": "EnemyAI"},
    {"name": "GrabbableObject", "base": "UnityEngine.MonoBehaviour"},
    {"name": "Shovel", "base": "GrabbableObject"},
    {"name": "FlashlightItem", "base": "GrabbableObject"},
    {"name": "UnityEngine.ScriptableObject"},
    {"name": "Game.Items.Item", "base": "UnityEngine.ScriptableObject"},
    {"name": "LevelConfig", "base": "UnityEngine.ScriptableObject"},
    {"name": "Settings", "base": "UnityEngine.ScriptableObject"}
]"#;

pub const PREFABS: &[(&str, &[&str])] = &[
    ("Crawler.prefab", &["UnityEngine.Transform", "CrawlerAI"]),
    ("Flowerman.prefab", &["UnityEngine.Transform", "FlowermanAI"]),
    ("ShovelA.prefab", &["UnityEngine.Transform", "Shovel"]),
    ("ShovelB.prefab", &["UnityEngine.Transform", "Shovel"]),
    ("Flashlight.prefab", &["UnityEngine.Transform", "FlashlightItem"]),
    ("Lamp.prefab", &["UnityEngine.Transform", "UnityEngine.Light"]),
    ("Spotlight.prefab", &["UnityEngine.Transform", "UnityEngine.Light"]),
    ("Empty.prefab", &["UnityEngine.Transform"]),
];

pub const SCRIPTABLE_OBJECTS: &[(&str, &str)] = &[
    ("Key.asset", "Game.Items.Item"),
    ("Lockpick.asset", "Game.Items.Item"),
    ("Level1.asset", "LevelConfig"),
    ("Audio.asset", "Settings"),
    ("Video.asset", "Settings"),
];

/// Writes a flat `Prefabs/` and `MonoBehaviour/` tree under `root` and
/// returns the matching manifest.
pub fn write_fixture(root: &Utf8Path) -> AssetManifest {
    let mut assets = Vec::new();
    for (name, components) in PREFABS {
        let path = format!("Prefabs/{name}");
        write_file(&root.join(&path), name);
        write_file(&root.join(format!("{path}.meta")), "guid");
        assets.push(serde_json::json!({ "path": path, "components": components }));
    }
    for (name, ty) in SCRIPTABLE_OBJECTS {
        let path = format!("MonoBehaviour/{name}");
        write_file(&root.join(&path), name);
        assets.push(serde_json::json!({ "path": path, "type": ty }));
    }
    let manifest = serde_json::json!({
        "types": serde_json::from_str::<serde_json::Value>(TYPES).unwrap(),
        "assets": assets,
    });
    serde_json::from_value(manifest).unwrap()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    FailMoves,
    PanicOnMove,
}

/// Wraps a filesystem store, counting moves and optionally injecting faults.
pub struct RecordingStore {
    pub inner: FsAssetStore,
    pub moves: Mutex<usize>,
    pub fault: Fault,
}

impl RecordingStore {
    pub fn new(inner: FsAssetStore, fault: Fault) -> Self {
        Self {
            inner,
            moves: Mutex::new(0),
            fault,
        }
    }

    pub fn move_count(&self) -> usize {
        *self.moves.lock().unwrap()
    }
}

impl AssetStore for RecordingStore {
    fn find_assets(
        &self,
        kind: AssetKind,
        folder: &Utf8Path,
    ) -> Result<Vec<AssetRecord>, MigrateError> {
        self.inner.find_assets(kind, folder)
    }

    fn asset_path(&self, id: &AssetId) -> Result<Utf8PathBuf, MigrateError> {
        self.inner.asset_path(id)
    }

    fn move_asset(&self, from: &Utf8Path, to: &Utf8Path) -> Result<(), MigrateError> {
        match self.fault {
            Fault::FailMoves => Err(MigrateError::MoveAsset {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                message: "injected".to_string(),
            }),
            Fault::PanicOnMove => panic!("injected panic"),
            Fault::None => {
                *self.moves.lock().unwrap() += 1;
                self.inner.move_asset(from, to)
            }
        }
    }

    fn delete_asset(&self, path: &Utf8Path) -> Result<(), MigrateError> {
        self.inner.delete_asset(path)
    }

    fn create_folder(&self, parent: &Utf8Path, name: &str) -> Result<Utf8PathBuf, MigrateError> {
        self.inner.create_folder(parent, name)
    }

    fn is_valid_folder(&self, path: &Utf8Path) -> bool {
        self.inner.is_valid_folder(path)
    }

    fn sub_folders(&self, path: &Utf8Path) -> Result<Vec<Utf8PathBuf>, MigrateError> {
        self.inner.sub_folders(path)
    }

    fn start_asset_editing(&self) {
        self.inner.start_asset_editing()
    }

    fn stop_asset_editing(&self) {
        self.inner.stop_asset_editing()
    }
}
