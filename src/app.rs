use camino::{Utf8Path, Utf8PathBuf};
use clap::ValueEnum;
use tracing::info;

use crate::classify::{Classifier, ClassifyOptions, FolderPlan};
use crate::config::ResolvedConfig;
use crate::domain::AssetKind;
use crate::error::MigrateError;
use crate::folder::{FolderReport, apply_plan, revert_plan};
use crate::migrate::{CleanReport, MigrationOptions, MigrationReport, Migrator, clean};
use crate::store::AssetStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortTarget {
    ScriptableObjects,
    Prefabs,
}

impl SortTarget {
    pub fn kind(self) -> AssetKind {
        match self {
            SortTarget::ScriptableObjects => AssetKind::ScriptableObject,
            SortTarget::Prefabs => AssetKind::Prefab,
        }
    }

    pub fn options(self) -> ClassifyOptions {
        match self {
            SortTarget::ScriptableObjects => ClassifyOptions::scriptable_objects(),
            SortTarget::Prefabs => ClassifyOptions::prefabs(),
        }
    }
}

pub struct App<S: AssetStore> {
    config: ResolvedConfig,
    destination_root: Utf8PathBuf,
    store: S,
}

impl<S: AssetStore> App<S> {
    pub fn new(config: ResolvedConfig, destination_root: Utf8PathBuf, store: S) -> Self {
        Self {
            config,
            destination_root,
            store,
        }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn destination_root(&self) -> &Utf8Path {
        &self.destination_root
    }

    pub fn migrate(&self, source_root: &Utf8Path) -> Result<MigrationReport, MigrateError> {
        let options = MigrationOptions::from_config(&self.config);
        let report =
            Migrator::new(&self.config.resolver, &options).run(source_root, &self.destination_root)?;
        info!(
            copied = report.copied,
            renamed = report.renamed,
            failed = report.failures.len(),
            "migration finished"
        );
        Ok(report)
    }

    /// Folder holding the assets `target` sorts.
    pub fn asset_root(&self, target: SortTarget) -> Utf8PathBuf {
        let roots = &self.config.sort_roots;
        let category = match target {
            SortTarget::ScriptableObjects => &roots.scriptable_objects,
            SortTarget::Prefabs => &roots.prefabs,
        };
        self.destination_root
            .join(self.config.resolver.category_root(category))
    }

    pub fn plan(&self, target: SortTarget) -> Result<FolderPlan, MigrateError> {
        let root = self.asset_root(target);
        let records = self.store.find_assets(target.kind(), &root)?;
        let classifier = Classifier::new(self.config.rules.clone());
        Ok(classifier.classify(&records, target.options()))
    }

    pub fn sort(&self, target: SortTarget) -> Result<FolderReport, MigrateError> {
        let plan = self.plan(target)?;
        let report = apply_plan(&self.store, &self.asset_root(target), &plan)?;
        info!(
            kind = %target.kind(),
            moved = report.moved,
            folders = report.folders_created.len(),
            "sort finished"
        );
        Ok(report)
    }

    pub fn unsort(&self, target: SortTarget) -> Result<FolderReport, MigrateError> {
        let report = revert_plan(&self.store, &self.asset_root(target), target.kind())?;
        info!(
            kind = %target.kind(),
            moved = report.moved,
            deleted = report.folders_deleted.len(),
            "unsort finished"
        );
        Ok(report)
    }

    pub fn clean(&self) -> Result<CleanReport, MigrateError> {
        clean(&self.destination_root)
    }
}
