//! Build item handles.
//!
//! The batch engine never inspects a caller's item beyond its path. Everything
//! else (metadata, ordering) is carried through untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Opaque caller-supplied handle that points at an artifact on disk.
pub trait BuildItem: Clone {
    /// Path of the artifact this item points at
    fn item_path(&self) -> &Path;

    /// Copy of this item pointing at `path`, all other data preserved
    fn with_item_path(&self, path: &Path) -> Self;
}

/// A build item with free-form metadata, as a build host would hand it over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    /// Path the item points at
    pub item_spec: PathBuf,

    /// Host metadata, carried through unchanged
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl TaskItem {
    pub fn new(item_spec: impl Into<PathBuf>) -> Self {
        Self {
            item_spec: item_spec.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }
}

impl BuildItem for TaskItem {
    fn item_path(&self) -> &Path {
        &self.item_spec
    }

    fn with_item_path(&self, path: &Path) -> Self {
        Self {
            item_spec: path.to_path_buf(),
            metadata: self.metadata.clone(),
        }
    }
}

impl BuildItem for PathBuf {
    fn item_path(&self) -> &Path {
        self
    }

    fn with_item_path(&self, path: &Path) -> Self {
        path.to_path_buf()
    }
}
