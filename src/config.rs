use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::classify::ClassifierRules;
use crate::collision::CaseMode;
use crate::error::MigrateError;
use crate::fs_util::normalize_separators;
use crate::mapping::{CategoryMapping, MappingResolver, default_mappings};

pub const DEFAULT_CONFIG_FILE: &str = "asset-migrate.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub mappings: Option<MappingTable>,
    #[serde(default)]
    pub excluded_categories: Option<Vec<String>>,
    #[serde(default)]
    pub minimal_copy: Option<bool>,
    #[serde(default)]
    pub minimal_exclusions: Option<Vec<String>>,
    #[serde(default)]
    pub case_insensitive: Option<CaseSetting>,
    #[serde(default)]
    pub classifier: Option<ClassifierEntry>,
    #[serde(default)]
    pub sort_roots: Option<SortRootsEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MappingTable {
    Shorthand(BTreeMap<String, String>),
    Detailed(Vec<CategoryMapping>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseSetting {
    #[default]
    Auto,
    Always,
    Never,
}

impl CaseSetting {
    pub fn case_mode(self) -> CaseMode {
        match self {
            CaseSetting::Always => CaseMode::EmulateInsensitive,
            CaseSetting::Never => CaseMode::Passthrough,
            CaseSetting::Auto if cfg!(target_os = "linux") => CaseMode::EmulateInsensitive,
            CaseSetting::Auto => CaseMode::Passthrough,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ClassifierEntry {
    #[serde(default)]
    pub trivial_component: Option<String>,
    #[serde(default)]
    pub reserved_namespace_prefix: Option<String>,
    #[serde(default)]
    pub opaque_base_types: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SortRootsEntry {
    #[serde(default)]
    pub scriptable_objects: Option<String>,
    #[serde(default)]
    pub prefabs: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortRoots {
    pub scriptable_objects: String,
    pub prefabs: String,
}

impl Default for SortRoots {
    fn default() -> Self {
        Self {
            scriptable_objects: "MonoBehaviour".to_string(),
            prefabs: "Prefabs".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub resolver: MappingResolver,
    pub excluded_categories: BTreeSet<String>,
    pub minimal_copy: bool,
    pub minimal_exclusions: Vec<Utf8PathBuf>,
    pub case_mode: CaseMode,
    pub rules: ClassifierRules,
    pub sort_roots: SortRoots,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, MigrateError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Err(MigrateError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| MigrateError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| MigrateError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    /// Like [`ConfigLoader::resolve`], but a missing default file yields the
    /// built-in configuration.
    pub fn resolve_or_default(path: Option<&str>) -> Result<ResolvedConfig, MigrateError> {
        match Self::resolve(path) {
            Err(MigrateError::MissingConfig) => Self::resolve_config(Config::default()),
            other => other,
        }
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, MigrateError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let mappings = match config.mappings {
            None => default_mappings(),
            Some(MappingTable::Shorthand(map)) => map
                .into_iter()
                .map(|(category, destination)| CategoryMapping::new(category, destination))
                .collect(),
            Some(MappingTable::Detailed(list)) => list,
        };
        let resolver = MappingResolver::new(mappings)?;

        let excluded_categories = config
            .excluded_categories
            .unwrap_or_else(default_excluded_categories)
            .into_iter()
            .collect();

        let minimal_exclusions = config
            .minimal_exclusions
            .unwrap_or_else(default_minimal_exclusions)
            .iter()
            .map(|path| Utf8PathBuf::from(normalize_separators(path)))
            .collect();

        let defaults = ClassifierRules::default();
        let classifier = config.classifier.unwrap_or_default();
        let rules = ClassifierRules {
            trivial_component: classifier
                .trivial_component
                .unwrap_or(defaults.trivial_component),
            reserved_namespace_prefix: classifier
                .reserved_namespace_prefix
                .unwrap_or(defaults.reserved_namespace_prefix),
            opaque_base_types: classifier
                .opaque_base_types
                .unwrap_or(defaults.opaque_base_types),
        };

        let default_roots = SortRoots::default();
        let roots = config.sort_roots.unwrap_or_default();
        let sort_roots = SortRoots {
            scriptable_objects: roots
                .scriptable_objects
                .unwrap_or(default_roots.scriptable_objects),
            prefabs: roots.prefabs.unwrap_or(default_roots.prefabs),
        };

        Ok(ResolvedConfig {
            schema_version,
            resolver,
            excluded_categories,
            minimal_copy: config.minimal_copy.unwrap_or(false),
            minimal_exclusions,
            case_mode: config.case_insensitive.unwrap_or_default().case_mode(),
            rules,
            sort_roots,
        })
    }
}

pub fn default_excluded_categories() -> Vec<String> {
    vec!["Scripts".to_string(), "Shader".to_string()]
}

pub fn default_minimal_exclusions() -> Vec<String> {
    vec![
        "Videos".to_string(),
        "Audio/AudioClips".to_string(),
        "Textures/Texture2Ds".to_string(),
        "Textures/Texture3Ds".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert!(!resolved.minimal_copy);
        assert!(resolved.excluded_categories.contains("Scripts"));
        assert!(resolved.excluded_categories.contains("Shader"));
        assert_eq!(resolved.minimal_exclusions.len(), 4);
        assert_eq!(
            resolved.resolver.resolve("AudioClip").map(|p| p.as_str()),
            Some("Audio/AudioClips")
        );
    }

    #[test]
    fn detailed_mappings_reject_duplicates() {
        let config: Config = serde_json::from_str(
            r#"{"mappings": [
                {"category": "Audio", "destination": "Sound"},
                {"category": "Audio", "destination": "Music"}
            ]}"#,
        )
        .unwrap();
        let err = ConfigLoader::resolve_config(config).unwrap_err();
        assert_matches!(err, MigrateError::DuplicateMapping(_));
    }

    #[test]
    fn explicit_case_setting_wins() {
        let config: Config = serde_json::from_str(r#"{"case_insensitive": "never"}"#).unwrap();
        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.case_mode, CaseMode::Passthrough);
    }
}
