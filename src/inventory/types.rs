use serde::{Deserialize, Serialize};

/// One file listed in a remote directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Sanitized name as shown on the listing page
    pub original_name: String,

    /// Absolute URL of the file
    pub url: String,

    /// Raw size text from the listing, empty when absent
    pub size: String,

    /// Raw modification date text from the listing, empty when absent
    pub date: String,
}

/// The result of listing one remote directory
///
/// Built once from a single successful fetch and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRecord {
    /// Absolute URL of the directory
    pub url: String,

    /// Files in listing order
    pub files: Vec<FileRecord>,

    /// Digit names of the subdirectories directly beneath this one
    pub subfolders: Vec<String>,
}

impl FolderRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            files: Vec::new(),
            subfolders: Vec::new(),
        }
    }

    /// Appends a file unless one with the same URL is already recorded
    ///
    /// Fancy-indexed listings link every file twice (icon and name).
    pub fn push_file(&mut self, file: FileRecord) -> bool {
        if self.files.iter().any(|existing| existing.url == file.url) {
            return false;
        }
        self.files.push(file);
        true
    }

    /// Appends a subfolder name unless it is already recorded
    pub fn push_subfolder(&mut self, name: &str) -> bool {
        if self.subfolders.iter().any(|existing| existing == name) {
            return false;
        }
        self.subfolders.push(name.to_string());
        true
    }

    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }
}
