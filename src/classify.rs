use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use camino::Utf8PathBuf;

use crate::domain::{AssetId, AssetRecord, RecordType, TypeDescriptor};

/// Names that steer composite-record classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierRules {
    /// Component present on every composite; never a grouping candidate.
    pub trivial_component: String,
    /// Namespace prefix of host-framework components, used only as a fallback.
    pub reserved_namespace_prefix: String,
    /// Base types too general to become a folder.
    pub opaque_base_types: Vec<String>,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            trivial_component: "Transform".to_string(),
            reserved_namespace_prefix: "Unity".to_string(),
            opaque_base_types: vec!["Component".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyOptions {
    /// Re-home single-member groups under a base type shared by others.
    pub fold_singletons: bool,
    /// Prefix each type folder with the first namespace segment.
    pub namespace_folders: bool,
}

impl ClassifyOptions {
    pub fn scriptable_objects() -> Self {
        Self {
            fold_singletons: false,
            namespace_folders: true,
        }
    }

    pub fn prefabs() -> Self {
        Self {
            fold_singletons: true,
            namespace_folders: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeGroup {
    pub ty: Arc<TypeDescriptor>,
    pub members: Vec<AssetId>,
    /// Set when at least one member was folded in from a derived type.
    pub folded: bool,
    /// Folder relative to the asset root; `None` keeps members at the root.
    pub destination: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderPlan {
    pub groups: Vec<TypeGroup>,
    /// Records with no grouping type at all.
    pub unclassified: Vec<AssetId>,
}

impl FolderPlan {
    pub fn placed_groups(&self) -> impl Iterator<Item = &TypeGroup> {
        self.groups.iter().filter(|group| group.destination.is_some())
    }

    pub fn group(&self, full_name: &str) -> Option<&TypeGroup> {
        self.groups
            .iter()
            .find(|group| group.ty.full_name() == full_name)
    }

    /// Records the plan leaves directly under the asset root.
    pub fn root_members(&self) -> usize {
        let ungrouped = self
            .groups
            .iter()
            .filter(|group| group.destination.is_none())
            .map(|group| group.members.len())
            .sum::<usize>();
        ungrouped + self.unclassified.len()
    }
}

pub struct Classifier {
    rules: ClassifierRules,
}

impl Classifier {
    pub fn new(rules: ClassifierRules) -> Self {
        Self { rules }
    }

    /// Type that decides a record's folder.
    ///
    /// Composites take their first component outside the reserved namespace,
    /// falling back to the first reserved one; the trivial component is
    /// skipped entirely.
    pub fn grouping_type(&self, record: &AssetRecord) -> Option<Arc<TypeDescriptor>> {
        let components = match &record.ty {
            RecordType::Simple(ty) => return Some(ty.clone()),
            RecordType::Composite(components) => components,
        };

        let mut first_reserved = None;
        for component in components {
            if component.name() == self.rules.trivial_component {
                continue;
            }
            if component.namespace_starts_with(&self.rules.reserved_namespace_prefix) {
                if first_reserved.is_none() {
                    first_reserved = Some(component);
                }
                continue;
            }
            return Some(component.clone());
        }
        first_reserved.cloned()
    }

    pub fn classify(&self, records: &[AssetRecord], options: ClassifyOptions) -> FolderPlan {
        let mut unclassified = Vec::new();
        let mut chosen = Vec::with_capacity(records.len());
        for record in records {
            match self.grouping_type(record) {
                Some(ty) => chosen.push((record.id.clone(), ty)),
                None => unclassified.push(record.id.clone()),
            }
        }

        let mut groups: BTreeMap<String, TypeGroup> = BTreeMap::new();
        for (id, ty) in &chosen {
            groups
                .entry(ty.full_name())
                .or_insert_with(|| TypeGroup {
                    ty: ty.clone(),
                    members: Vec::new(),
                    folded: false,
                    destination: None,
                })
                .members
                .push(id.clone());
        }

        if options.fold_singletons {
            groups = self.fold_singletons(groups, &chosen);
        }

        let mut groups = groups.into_values().collect::<Vec<_>>();
        for group in &mut groups {
            if group.members.len() > 1 || group.folded {
                group.destination = Some(self.folder_for(&group.ty, options));
            }
        }

        FolderPlan {
            groups,
            unclassified,
        }
    }

    /// Moves each single-member group into its base type's group when other
    /// chosen types share that base. Targets come from the unfolded grouping
    /// and only a group's own members move, so a fold never climbs more than
    /// one level.
    fn fold_singletons(
        &self,
        groups: BTreeMap<String, TypeGroup>,
        chosen: &[(AssetId, Arc<TypeDescriptor>)],
    ) -> BTreeMap<String, TypeGroup> {
        let targets = groups
            .iter()
            .filter(|(_, group)| group.members.len() == 1)
            .filter_map(|(key, group)| {
                let base = group.ty.base()?;
                if self.is_opaque(base) {
                    return None;
                }
                let family = chosen
                    .iter()
                    .filter(|(_, ty)| ty.is_assignable_to(base))
                    .count();
                (family > 1).then(|| (key.clone(), base.clone()))
            })
            .collect::<HashMap<_, _>>();

        let (folding, staying): (Vec<_>, Vec<_>) = groups
            .into_iter()
            .partition(|(key, _)| targets.contains_key(key));

        let mut folded: BTreeMap<String, TypeGroup> = staying.into_iter().collect();
        for (key, single) in folding {
            let Some(base) = targets.get(&key) else {
                continue;
            };
            let target = folded.entry(base.full_name()).or_insert_with(|| TypeGroup {
                ty: base.clone(),
                members: Vec::new(),
                folded: false,
                destination: None,
            });
            target.members.extend(single.members);
            target.folded = true;
        }
        folded
    }

    fn folder_for(&self, ty: &TypeDescriptor, options: ClassifyOptions) -> Utf8PathBuf {
        match ty.namespace_root() {
            Some(root) if options.namespace_folders => Utf8PathBuf::from(root).join(ty.name()),
            _ => Utf8PathBuf::from(ty.name()),
        }
    }

    fn is_opaque(&self, ty: &TypeDescriptor) -> bool {
        let full_name = ty.full_name();
        self.rules
            .opaque_base_types
            .iter()
            .any(|name| name == ty.name() || *name == full_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(full_name: &str) -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor::parse(full_name))
    }

    fn derived(full_name: &str, base: &Arc<TypeDescriptor>) -> Arc<TypeDescriptor> {
        Arc::new(TypeDescriptor::parse(full_name).with_base(base.clone()))
    }

    #[test]
    fn simple_records_group_by_own_type() {
        let item = ty("Game.Items.Item");
        let level = ty("LevelConfig");
        let records = vec![
            AssetRecord::simple("a", item.clone()),
            AssetRecord::simple("b", item.clone()),
            AssetRecord::simple("c", level.clone()),
        ];

        let plan = Classifier::new(ClassifierRules::default())
            .classify(&records, ClassifyOptions::scriptable_objects());

        let items = plan.group("Game.Items.Item").unwrap();
        assert_eq!(items.members.len(), 2);
        assert_eq!(items.destination.as_deref().map(|p| p.as_str()), Some("Game/Item"));
        assert_eq!(plan.group("LevelConfig").unwrap().destination, None);
        assert_eq!(plan.root_members(), 1);
    }

    #[test]
    fn composite_skips_trivial_and_reserved_components() {
        let transform = ty("UnityEngine.Transform");
        let collider = ty("UnityEngine.BoxCollider");
        let enemy = ty("EnemyAI");
        let record = AssetRecord::composite(
            "crawler",
            vec![transform.clone(), collider.clone(), enemy.clone()],
        );

        let classifier = Classifier::new(ClassifierRules::default());
        assert_eq!(classifier.grouping_type(&record), Some(enemy));
    }

    #[test]
    fn composite_falls_back_to_first_reserved_component() {
        let record = AssetRecord::composite(
            "light",
            vec![
                ty("UnityEngine.Transform"),
                ty("UnityEngine.Light"),
                ty("UnityEngine.Rendering.Volume"),
            ],
        );
        let classifier = Classifier::new(ClassifierRules::default());
        assert_eq!(
            classifier.grouping_type(&record).map(|t| t.full_name()),
            Some("UnityEngine.Light".to_string())
        );
    }

    #[test]
    fn composite_with_only_trivial_component_is_unclassified() {
        let records = vec![AssetRecord::composite(
            "empty",
            vec![ty("UnityEngine.Transform")],
        )];
        let plan = Classifier::new(ClassifierRules::default())
            .classify(&records, ClassifyOptions::prefabs());
        assert!(plan.groups.is_empty());
        assert_eq!(plan.unclassified, vec![AssetId::new("empty")]);
    }

    #[test]
    fn singleton_folds_into_populated_base() {
        let component = ty("UnityEngine.Component");
        let enemy = derived("EnemyAI", &component);
        let crawler = derived("CrawlerAI", &enemy);
        let flower = derived("FlowermanAI", &enemy);
        let records = vec![
            AssetRecord::composite("crawler", vec![crawler]),
            AssetRecord::composite("flower", vec![flower]),
        ];

        let plan = Classifier::new(ClassifierRules::default())
            .classify(&records, ClassifyOptions::prefabs());

        assert_eq!(plan.groups.len(), 1);
        let group = plan.group("EnemyAI").unwrap();
        assert!(group.folded);
        assert_eq!(group.members.len(), 2);
        assert_eq!(group.destination.as_deref().map(|p| p.as_str()), Some("EnemyAI"));
    }

    #[test]
    fn fold_is_single_level() {
        let component = ty("UnityEngine.Component");
        let grand = derived("Grab", &component);
        let parent = derived("Tool", &grand);
        let flashlight = derived("Flashlight", &parent);
        let shovel = derived("Shovel", &grand);
        let records = vec![
            AssetRecord::composite("flashlight", vec![flashlight]),
            AssetRecord::composite("shovel", vec![shovel]),
        ];

        let plan = Classifier::new(ClassifierRules::default())
            .classify(&records, ClassifyOptions::prefabs());

        // Flashlight's base (Tool) has one member, so it stays put; Shovel's
        // base (Grab) covers both.
        assert!(plan.group("Tool").is_none());
        assert_eq!(plan.group("Flashlight").unwrap().destination, None);
        let grab = plan.group("Grab").unwrap();
        assert_eq!(grab.members, vec![AssetId::new("shovel")]);
        assert!(grab.destination.is_some());
    }

    #[test]
    fn opaque_base_never_receives_folds() {
        let component = ty("UnityEngine.Component");
        let records = vec![
            AssetRecord::composite("a", vec![derived("Alpha", &component)]),
            AssetRecord::composite("b", vec![derived("Beta", &component)]),
        ];
        let plan = Classifier::new(ClassifierRules::default())
            .classify(&records, ClassifyOptions::prefabs());
        assert!(plan.placed_groups().next().is_none());
        assert_eq!(plan.root_members(), 2);
    }

    fn chain_plan(leaf_name: &str) -> FolderPlan {
        let component = ty("UnityEngine.Component");
        let top = derived("Top", &component);
        let mid = derived("Mid", &top);
        let leaf = derived(leaf_name, &mid);
        let records = vec![
            AssetRecord::composite("leaf", vec![leaf]),
            AssetRecord::composite("mid", vec![mid]),
        ];
        Classifier::new(ClassifierRules::default()).classify(&records, ClassifyOptions::prefabs())
    }

    #[test]
    fn chained_singletons_each_fold_one_level() {
        // "Leaf" sorts before "Mid", "Zleaf" after it.
        for leaf_name in ["Leaf", "Zleaf"] {
            let plan = chain_plan(leaf_name);

            let mid = plan.group("Mid").unwrap();
            assert_eq!(mid.members, vec![AssetId::new("leaf")], "{leaf_name}");
            assert!(mid.folded);
            assert_eq!(mid.destination.as_deref().map(|p| p.as_str()), Some("Mid"));

            let top = plan.group("Top").unwrap();
            assert_eq!(top.members, vec![AssetId::new("mid")], "{leaf_name}");
            assert_eq!(top.destination.as_deref().map(|p| p.as_str()), Some("Top"));

            assert!(plan.group(leaf_name).is_none());
            assert_eq!(plan.groups.len(), 2);
        }
    }
}
