use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::MigrateError;

/// Runtime type of an asset or of one of its attached components.
///
/// Carries everything classification needs: the short name, the dotted
/// namespace and a link to the base type, so hierarchy checks never need
/// reflection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    name: String,
    namespace: Option<String>,
    base: Option<Arc<TypeDescriptor>>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            base: None,
        }
    }

    /// Splits `Namespace.Sub.Name` at the last dot.
    pub fn parse(full_name: &str) -> Self {
        let trimmed = full_name.trim();
        match trimmed.rsplit_once('.') {
            Some((namespace, name)) if !namespace.is_empty() => {
                Self::new(name).with_namespace(namespace)
            }
            _ => Self::new(trimmed),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = if namespace.is_empty() {
            None
        } else {
            Some(namespace)
        };
        self
    }

    pub fn with_base(mut self, base: Arc<TypeDescriptor>) -> Self {
        self.base = Some(base);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn base(&self) -> Option<&Arc<TypeDescriptor>> {
        self.base.as_ref()
    }

    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(namespace) => format!("{namespace}.{}", self.name),
            None => self.name.clone(),
        }
    }

    /// First segment of the namespace, used as the top-level sort folder.
    pub fn namespace_root(&self) -> Option<&str> {
        self.namespace
            .as_deref()
            .and_then(|namespace| namespace.split('.').next())
            .filter(|root| !root.is_empty())
    }

    pub fn namespace_starts_with(&self, prefix: &str) -> bool {
        self.namespace
            .as_deref()
            .map(|namespace| namespace.starts_with(prefix))
            .unwrap_or(false)
    }

    /// True when `self` is `other` or derives from it.
    pub fn is_assignable_to(&self, other: &TypeDescriptor) -> bool {
        let target = other.full_name();
        let mut current = Some(self);
        while let Some(ty) = current {
            if ty.full_name() == target {
                return true;
            }
            current = ty.base.as_deref();
        }
        false
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

/// Type declaration as written in an asset manifest.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TypeDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
}

/// Resolved set of type descriptors keyed by full name.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    types: HashMap<String, Arc<TypeDescriptor>>,
}

impl TypeTable {
    pub fn build(definitions: &[TypeDefinition]) -> Result<Self, MigrateError> {
        let declared = definitions
            .iter()
            .map(|def| (def.name.trim().to_string(), def.base.clone()))
            .collect::<HashMap<_, _>>();

        let mut table = Self::default();
        for def in definitions {
            let mut visiting = Vec::new();
            table.resolve(def.name.trim(), &declared, &mut visiting)?;
        }
        Ok(table)
    }

    fn resolve(
        &mut self,
        full_name: &str,
        declared: &HashMap<String, Option<String>>,
        visiting: &mut Vec<String>,
    ) -> Result<Arc<TypeDescriptor>, MigrateError> {
        if let Some(existing) = self.types.get(full_name) {
            return Ok(existing.clone());
        }
        if visiting.iter().any(|name| name == full_name) {
            return Err(MigrateError::ManifestParse(format!(
                "type hierarchy cycle through {full_name}"
            )));
        }
        let base_name = declared
            .get(full_name)
            .ok_or_else(|| MigrateError::UnknownType(full_name.to_string()))?;

        visiting.push(full_name.to_string());
        let mut descriptor = TypeDescriptor::parse(full_name);
        if let Some(base_name) = base_name {
            let base = self.resolve(base_name.trim(), declared, visiting)?;
            descriptor = descriptor.with_base(base);
        }
        visiting.pop();

        let descriptor = Arc::new(descriptor);
        self.types.insert(full_name.to_string(), descriptor.clone());
        Ok(descriptor)
    }

    pub fn get(&self, full_name: &str) -> Result<Arc<TypeDescriptor>, MigrateError> {
        self.types
            .get(full_name.trim())
            .cloned()
            .ok_or_else(|| MigrateError::UnknownType(full_name.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Query filter for asset lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AssetKind {
    ScriptableObject,
    Prefab,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::ScriptableObject => write!(f, "scriptable-object"),
            AssetKind::Prefab => write!(f, "prefab"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordType {
    /// A record typed by its own declared type.
    Simple(Arc<TypeDescriptor>),
    /// A record built from components, in attachment order.
    Composite(Vec<Arc<TypeDescriptor>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub id: AssetId,
    pub ty: RecordType,
}

impl AssetRecord {
    pub fn simple(id: impl Into<String>, ty: Arc<TypeDescriptor>) -> Self {
        Self {
            id: AssetId::new(id),
            ty: RecordType::Simple(ty),
        }
    }

    pub fn composite(id: impl Into<String>, components: Vec<Arc<TypeDescriptor>>) -> Self {
        Self {
            id: AssetId::new(id),
            ty: RecordType::Composite(components),
        }
    }

    pub fn kind(&self) -> AssetKind {
        match self.ty {
            RecordType::Simple(_) => AssetKind::ScriptableObject,
            RecordType::Composite(_) => AssetKind::Prefab,
        }
    }
}
