use std::collections::HashMap;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::MigrateError;
use crate::fs_util::normalize_separators;

/// One row of the category table: ripped folder name to project-relative
/// destination.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CategoryMapping {
    pub category: String,
    pub destination: String,
}

impl CategoryMapping {
    pub fn new(category: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            destination: destination.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MappingResolver {
    table: HashMap<String, Utf8PathBuf>,
}

impl MappingResolver {
    pub fn new(mappings: Vec<CategoryMapping>) -> Result<Self, MigrateError> {
        let mut table = HashMap::with_capacity(mappings.len());
        for mapping in mappings {
            let destination = Utf8PathBuf::from(normalize_separators(&mapping.destination));
            if table.insert(mapping.category.clone(), destination).is_some() {
                return Err(MigrateError::DuplicateMapping(mapping.category));
            }
        }
        Ok(Self { table })
    }

    /// Destination for a category, or `None` when the category is not migrated.
    pub fn resolve(&self, category: &str) -> Option<&Utf8PathBuf> {
        self.table.get(category)
    }

    /// Mapped destination, falling back to the category name itself.
    pub fn category_root(&self, category: &str) -> Utf8PathBuf {
        self.resolve(category)
            .cloned()
            .unwrap_or_else(|| Utf8PathBuf::from(category))
    }
}

pub fn default_mappings() -> Vec<CategoryMapping> {
    [
        ("AnimationClip", "Animations/AnimationClips"),
        ("AnimatorController", "Animations/AnimatorControllers"),
        ("AudioClip", "Audio/AudioClips"),
        ("AudioMixerController", "Audio/AudioMixerControllers"),
        ("Font", "Fonts"),
        ("Material", "Materials"),
        ("Mesh", "Meshes"),
        ("MonoBehaviour", "ScriptableObjects"),
        ("PhysicMaterial", "PhysicsMaterials"),
        ("PrefabInstance", "Prefabs"),
        ("Resources", "Resources"),
        ("Scenes", "Scenes"),
        ("Sprite", "Sprites"),
        ("Texture2D", "Textures/Texture2Ds"),
        ("Texture3D", "Textures/Texture3Ds"),
        ("VideoClip", "Videos"),
    ]
    .into_iter()
    .map(|(category, destination)| CategoryMapping::new(category, destination))
    .collect()
}
