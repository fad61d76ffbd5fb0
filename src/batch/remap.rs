//! Path rename bookkeeping and propagation into auxiliary item lists.

use serde::{Deserialize, Serialize, Serializer};
use sn_provider::PathKey;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::item::BuildItem;

/// One original → new path rename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rename {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Original artifact path → signed artifact path, for renamed artifacts only.
///
/// Lookups are case-insensitive; iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct RenameMap {
    renames: Vec<Rename>,
    index: HashMap<PathKey, usize>,
}

impl RenameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rename. A repeated `from` keeps the first destination.
    pub fn insert(&mut self, from: &Path, to: &Path) -> bool {
        let key = PathKey::from_path(from);
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.renames.len());
        self.renames.push(Rename {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
        true
    }

    pub fn get(&self, from: &Path) -> Option<&Path> {
        self.index
            .get(&PathKey::from_path(from))
            .map(|&i| self.renames[i].to.as_path())
    }

    pub fn len(&self) -> usize {
        self.renames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rename> {
        self.renames.iter()
    }
}

impl Serialize for RenameMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.renames)
    }
}

/// Rewrite `items` through `renames`, 1:1 and in order.
pub fn remap<H: BuildItem>(items: &[H], renames: &RenameMap) -> Vec<H> {
    items
        .iter()
        .map(|item| match renames.get(item.item_path()) {
            Some(to) => item.with_item_path(to),
            None => item.clone(),
        })
        .collect()
}
