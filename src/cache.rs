use crate::error::SolarError;
use crate::loader::{load, LoadOptions};
use crate::table::ObservationTable;
use log::{info, warn};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Memoises loaded tables by file path and load options.
///
/// The cache lives as long as its owner (usually a [`crate::Dashboard`]); entries are only
/// dropped through [`TableCache::invalidate`] or [`TableCache::clear`].
#[derive(Debug, Default)]
pub struct TableCache {
    tables: HashMap<(PathBuf, LoadOptions), ObservationTable>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached table for `(path, options)`, loading it on first use.
    ///
    /// Failed loads are not cached.
    pub fn get_or_load(
        &mut self,
        path: &Path,
        options: &LoadOptions,
    ) -> Result<ObservationTable, SolarError> {
        let key = (path.to_path_buf(), options.clone());
        match self.tables.entry(key) {
            Entry::Occupied(entry) => {
                info!("Cache hit for {:?}", path);
                Ok(entry.get().clone())
            }
            Entry::Vacant(entry) => {
                warn!("Cache miss for {:?}. Loading from disk.", path);
                let table = load(path, options)?;
                Ok(entry.insert(table).clone())
            }
        }
    }

    pub fn contains(&self, path: &Path, options: &LoadOptions) -> bool {
        self.tables
            .contains_key(&(path.to_path_buf(), options.clone()))
    }

    /// Drops every cached variant of `path`. Returns how many entries were removed.
    pub fn invalidate(&mut self, path: &Path) -> usize {
        let before = self.tables.len();
        self.tables.retain(|(cached, _), _| cached != path);
        before - self.tables.len()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
