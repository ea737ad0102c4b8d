use crate::inventory::types::{FileRecord, FolderRecord};
use crate::url::DirectoryId;
use crate::HarvestError;
use std::collections::btree_map::{self, BTreeMap};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Mapping from directory id to the folder found there
///
/// Insertion is first-writer-wins: once an id is present its record is
/// never replaced. Iteration is in numeric id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    folders: BTreeMap<DirectoryId, FolderRecord>,
}

/// One row of the rename plan: a file together with its folder
#[derive(Debug, Clone, Copy)]
pub struct RenameRow<'a> {
    pub folder_id: &'a DirectoryId,
    pub file: &'a FileRecord,
    pub folder_url: &'a str,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record if the id is absent; returns false if it was already present
    pub fn insert(&mut self, id: DirectoryId, record: FolderRecord) -> bool {
        match self.folders.entry(id) {
            btree_map::Entry::Occupied(_) => false,
            btree_map::Entry::Vacant(slot) => {
                slot.insert(record);
                true
            }
        }
    }

    pub fn contains(&self, id: &DirectoryId) -> bool {
        self.folders.contains_key(id)
    }

    pub fn get(&self, id: &DirectoryId) -> Option<&FolderRecord> {
        self.folders.get(id)
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &DirectoryId> {
        self.folders.keys()
    }

    pub fn folders(&self) -> impl Iterator<Item = (&DirectoryId, &FolderRecord)> {
        self.folders.iter()
    }

    /// Number of folders that list at least one file
    pub fn folders_with_files(&self) -> usize {
        self.folders.values().filter(|f| f.has_files()).count()
    }

    pub fn total_files(&self) -> usize {
        self.folders.values().map(|f| f.files.len()).sum()
    }

    /// Every file across all folders, in folder order then listing order
    pub fn rename_rows(&self) -> impl Iterator<Item = RenameRow<'_>> {
        self.folders.iter().flat_map(|(id, folder)| {
            folder.files.iter().map(move |file| RenameRow {
                folder_id: id,
                file,
                folder_url: folder.url.as_str(),
            })
        })
    }

    /// The persisted view: folders without files are dropped
    pub fn persisted(&self) -> BTreeMap<&DirectoryId, &FolderRecord> {
        self.folders.iter().filter(|(_, f)| f.has_files()).collect()
    }

    pub fn to_json_string(&self) -> Result<String, HarvestError> {
        Ok(serde_json::to_string_pretty(&self.persisted())?)
    }

    pub fn from_json_str(content: &str) -> Result<Self, HarvestError> {
        let folders: BTreeMap<DirectoryId, FolderRecord> = serde_json::from_str(content)?;
        Ok(Self { folders })
    }

    /// Writes the persisted view as pretty-printed JSON
    pub fn save_json(&self, path: &Path) -> Result<(), HarvestError> {
        let content = self.to_json_string()?;
        std::fs::write(path, content)?;
        tracing::info!(
            "Inventory written to {} ({} folders with files)",
            path.display(),
            self.folders_with_files()
        );
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self, HarvestError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An [`Inventory`] shared between concurrent crawl workers
///
/// All access goes through one mutex so insert-if-absent is atomic.
#[derive(Debug, Default)]
pub struct SharedInventory {
    inner: Mutex<Inventory>,
}

impl SharedInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_if_absent(&self, id: DirectoryId, record: FolderRecord) -> bool {
        lock(&self.inner).insert(id, record)
    }

    pub fn contains(&self, id: &DirectoryId) -> bool {
        lock(&self.inner).contains(id)
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.inner).is_empty()
    }

    pub fn snapshot(&self) -> Inventory {
        lock(&self.inner).clone()
    }
}

/// Directory URLs that have already been dispatched to a fetch
///
/// URLs are marked before the fetch starts, so a failed fetch is not picked
/// up again by a worker racing in behind it.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically checks and marks a URL; returns true only for the first caller
    pub fn mark(&self, url: &str) -> bool {
        lock(&self.urls).insert(url.to_string())
    }
}
